//! HTML and plain-text rendering of clinical reports.

use super::report::{ClinicalReport, Metric, Tone, Treatment};

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; margin: 0; padding: 24px; color: #1f2937; background: #fff; }
.report { max-width: 800px; margin: 0 auto; }
.header { text-align: center; border-bottom: 3px solid #2563eb; padding-bottom: 16px; margin-bottom: 24px; }
.header h1 { margin: 0; color: #1e3a8a; font-size: 24px; }
.header .subtitle { color: #4b5563; margin: 4px 0 12px; }
.header .institution { font-size: 13px; color: #374151; }
.section { margin-bottom: 20px; padding: 16px; border: 1px solid #e5e7eb; border-radius: 8px; }
.section h2 { margin: 0 0 12px; font-size: 16px; color: #1e3a8a; }
table.fields { width: 100%; border-collapse: collapse; }
table.fields th { text-align: left; width: 40%; color: #6b7280; font-weight: normal; padding: 4px 0; }
table.fields td { font-weight: bold; padding: 4px 0; }
.result.negative { background: #f0fdf4; border-color: #16a34a; }
.result.positive { background: #fef2f2; border-color: #dc2626; }
.result .prediction { font-size: 20px; font-weight: bold; margin: 8px 0 16px; }
.result.negative .prediction { color: #15803d; }
.result.positive .prediction { color: #b91c1c; }
.metric { margin-bottom: 12px; }
.metric .metric-head { display: flex; justify-content: space-between; font-size: 14px; }
.bar { height: 10px; background: #e5e7eb; border-radius: 5px; overflow: hidden; margin-top: 4px; }
.bar .fill { height: 100%; }
.fill.green { background: #16a34a; }
.fill.red { background: #dc2626; }
.image img { max-width: 100%; max-height: 400px; display: block; margin: 0 auto; }
.disclaimer { background: #fffbeb; border-color: #f59e0b; font-size: 13px; }
.disclaimer h2 { color: #b45309; }
.signature { display: flex; justify-content: space-between; margin-top: 40px; }
.signature .slot { width: 45%; border-top: 1px solid #9ca3af; padding-top: 8px; font-size: 13px; }
.footer { text-align: center; font-size: 11px; color: #6b7280; margin-top: 24px; }
@media print { body { padding: 0; } .section { break-inside: avoid; } }
"#;

/// Escape text for inclusion in HTML content or attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn field_row(label: &str, value: &str) -> String {
    format!(
        "<tr><th>{}</th><td>{}</td></tr>\n",
        escape_html(label),
        escape_html(value)
    )
}

fn metric_html(metric: &Metric) -> String {
    let tone = match metric.tone {
        Tone::Green => "green",
        Tone::Red => "red",
    };
    format!(
        "<div class=\"metric\"><div class=\"metric-head\"><span>{}</span><strong>{}</strong></div>\
         <div class=\"bar\"><div class=\"fill {}\" style=\"width: {:.2}%\"></div></div></div>\n",
        escape_html(&metric.label),
        escape_html(&metric.display),
        tone,
        metric.bar_width
    )
}

/// Only inline base64 images are embedded.
fn is_inline_image(url: &str) -> bool {
    url.starts_with("data:image/") && url.contains(";base64,")
}

impl ClinicalReport {
    /// Standalone HTML document with inline CSS and inline image.
    pub fn render_html(&self) -> String {
        let labels = self.locale.labels();
        let lang = match self.locale {
            super::Locale::Fr => "fr",
            super::Locale::En => "en",
        };
        let mut html = String::new();

        html.push_str(&format!(
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{} - {}</title>\n<style>{}</style>\n</head>\n<body>\n<div class=\"report\">\n",
            lang,
            escape_html(&self.header.title),
            escape_html(&self.patient.full_name),
            STYLE
        ));

        // 1. Header
        let institution = &self.header.institution;
        html.push_str(&format!(
            "<div class=\"header\">\n<h1>{}</h1>\n<p class=\"subtitle\">{}</p>\n<div class=\"institution\"><strong>{}</strong><br>{}<br>{} &bull; {}</div>\n</div>\n",
            escape_html(&self.header.title),
            escape_html(&self.header.subtitle),
            escape_html(&institution.name),
            escape_html(&institution.address),
            escape_html(&institution.phone),
            escape_html(&institution.email)
        ));

        // 2. Patient
        let patient = &self.patient;
        html.push_str(&format!(
            "<div class=\"section patient\">\n<h2>{}</h2>\n<table class=\"fields\">\n",
            escape_html(labels.patient_section)
        ));
        html.push_str(&field_row(labels.full_name, &patient.full_name));
        html.push_str(&field_row(
            labels.date_of_birth,
            patient.date_of_birth.as_deref().unwrap_or(labels.not_provided),
        ));
        if let Some(age) = patient.age {
            html.push_str(&field_row(labels.age, &format!("{} {}", age, labels.years)));
        }
        html.push_str(&field_row(
            labels.gender,
            patient.gender.as_deref().unwrap_or(labels.not_provided),
        ));
        if let Some(patient_id) = &patient.patient_id {
            html.push_str(&field_row(labels.patient_id, patient_id));
        }
        html.push_str("</table>\n</div>\n");

        // 3. Diagnostic
        let diagnostic = &self.diagnostic;
        html.push_str(&format!(
            "<div class=\"section diagnostic\">\n<h2>{}</h2>\n<table class=\"fields\">\n",
            escape_html(labels.diagnostic_section)
        ));
        html.push_str(&field_row(labels.exam_date, &diagnostic.exam_date));
        html.push_str(&field_row(labels.exam_time, &diagnostic.exam_time));
        html.push_str(&field_row(labels.clinician, &diagnostic.clinician));
        html.push_str(&field_row(labels.institution, &diagnostic.institution));
        html.push_str(&field_row(labels.image_file, &diagnostic.image_name));
        html.push_str("</table>\n</div>\n");

        // 4. Result
        let result = &self.result;
        let treatment = match result.treatment {
            Treatment::Negative => "negative",
            Treatment::Positive => "positive",
        };
        html.push_str(&format!(
            "<div class=\"section result {}\">\n<h2>{}</h2>\n<p>{}</p>\n<p class=\"prediction\">{}</p>\n",
            treatment,
            escape_html(labels.result_section),
            escape_html(labels.ai_assisted),
            escape_html(&result.prediction)
        ));
        html.push_str(&metric_html(&result.probability));
        html.push_str(&metric_html(&result.confidence));
        html.push_str("</div>\n");

        // 5. Image
        if let Some(image) = self.image.as_ref().filter(|i| is_inline_image(&i.data_url)) {
            html.push_str(&format!(
                "<div class=\"section image\">\n<h2>{}</h2>\n<img src=\"{}\" alt=\"{}\">\n<p>{}</p>\n</div>\n",
                escape_html(labels.image_section),
                escape_html(&image.data_url),
                escape_html(labels.image_alt),
                escape_html(&image.name)
            ));
        }

        // 6. Disclaimer
        html.push_str(&format!(
            "<div class=\"section disclaimer\">\n<h2>{}</h2>\n<p>{}</p>\n</div>\n",
            escape_html(labels.disclaimer_heading),
            escape_html(&self.disclaimer)
        ));

        // 7. Signature and footer
        let footer = &self.footer;
        html.push_str(&format!(
            "<div class=\"signature\">\n<div class=\"slot\">{}<br><strong>{}</strong></div>\n<div class=\"slot\">{}<br>{}</div>\n</div>\n",
            escape_html(labels.signature_heading),
            escape_html(&footer.clinician),
            escape_html(labels.stamp_heading),
            escape_html(&footer.institution)
        ));
        html.push_str(&format!(
            "<div class=\"footer\">{} {} &bull; {}: {}</div>\n",
            escape_html(labels.generated_on),
            escape_html(&footer.generated_at),
            escape_html(labels.reference),
            escape_html(&footer.reference)
        ));

        html.push_str("</div>\n</body>\n</html>\n");
        html
    }

    /// Plain-text rendition of the same sections.
    pub fn render_text(&self) -> String {
        let labels = self.locale.labels();
        let mut lines: Vec<String> = Vec::new();
        let rule = "=".repeat(60);

        lines.push(rule.clone());
        lines.push(self.header.title.clone());
        lines.push(self.header.subtitle.clone());
        lines.push(self.header.institution.name.clone());
        lines.push(rule.clone());

        lines.push(String::new());
        lines.push(format!("[{}]", labels.patient_section));
        lines.push(format!("{}: {}", labels.full_name, self.patient.full_name));
        lines.push(format!(
            "{}: {}",
            labels.date_of_birth,
            self.patient.date_of_birth.as_deref().unwrap_or(labels.not_provided)
        ));
        if let Some(age) = self.patient.age {
            lines.push(format!("{}: {} {}", labels.age, age, labels.years));
        }
        lines.push(format!(
            "{}: {}",
            labels.gender,
            self.patient.gender.as_deref().unwrap_or(labels.not_provided)
        ));
        if let Some(patient_id) = &self.patient.patient_id {
            lines.push(format!("{}: {}", labels.patient_id, patient_id));
        }

        lines.push(String::new());
        lines.push(format!("[{}]", labels.diagnostic_section));
        lines.push(format!("{}: {}", labels.exam_date, self.diagnostic.exam_date));
        lines.push(format!("{}: {}", labels.exam_time, self.diagnostic.exam_time));
        lines.push(format!("{}: {}", labels.clinician, self.diagnostic.clinician));
        lines.push(format!("{}: {}", labels.institution, self.diagnostic.institution));
        lines.push(format!("{}: {}", labels.image_file, self.diagnostic.image_name));

        lines.push(String::new());
        lines.push(format!("[{}]", labels.result_section));
        lines.push(self.result.prediction.clone());
        for metric in [&self.result.probability, &self.result.confidence] {
            lines.push(format!("{}: {}", metric.label, metric.display));
        }

        if let Some(image) = &self.image {
            lines.push(String::new());
            lines.push(format!("[{}]", labels.image_section));
            lines.push(image.name.clone());
        }

        lines.push(String::new());
        lines.push(format!("[{}]", labels.disclaimer_heading));
        lines.push(self.disclaimer.clone());

        lines.push(String::new());
        lines.push(format!("{}: {}", labels.signature_heading, self.footer.clinician));
        lines.push(format!("{}: {}", labels.stamp_heading, self.footer.institution));
        lines.push(format!(
            "{} {} - {}: {}",
            labels.generated_on, self.footer.generated_at, labels.reference, self.footer.reference
        ));

        lines.join("\n") + "\n"
    }
}
