//! Report localization: labels and date formats.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::Gender;

/// Language and date conventions of rendered reports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// French, `dd/mm/yyyy`
    #[default]
    Fr,
    /// English, `mm/dd/yyyy`
    En,
}

/// Fixed report captions for one locale.
#[derive(Debug, Clone, Copy)]
pub struct Labels {
    pub report_title: &'static str,
    pub subtitle: &'static str,
    pub patient_section: &'static str,
    pub full_name: &'static str,
    pub date_of_birth: &'static str,
    pub age: &'static str,
    pub years: &'static str,
    pub gender: &'static str,
    pub patient_id: &'static str,
    pub diagnostic_section: &'static str,
    pub exam_date: &'static str,
    pub exam_time: &'static str,
    pub clinician: &'static str,
    pub institution: &'static str,
    pub image_file: &'static str,
    pub result_section: &'static str,
    pub ai_assisted: &'static str,
    pub probability: &'static str,
    pub confidence: &'static str,
    pub image_section: &'static str,
    pub image_alt: &'static str,
    pub disclaimer_heading: &'static str,
    pub signature_heading: &'static str,
    pub stamp_heading: &'static str,
    pub generated_on: &'static str,
    pub reference: &'static str,
    pub doctor_prefix: &'static str,
    pub not_provided: &'static str,
}

const FR: Labels = Labels {
    report_title: "RAPPORT DE DIAGNOSTIC MÉDICAL",
    subtitle: "Système de diagnostic assisté par intelligence artificielle",
    patient_section: "Informations du Patient",
    full_name: "Nom complet",
    date_of_birth: "Date de naissance",
    age: "Âge",
    years: "ans",
    gender: "Genre",
    patient_id: "ID Patient",
    diagnostic_section: "Informations du Diagnostic",
    exam_date: "Date de l'examen",
    exam_time: "Heure de l'examen",
    clinician: "Médecin responsable",
    institution: "Établissement",
    image_file: "Fichier analysé",
    result_section: "Résultat de l'Analyse IA",
    ai_assisted: "Diagnostic assisté par intelligence artificielle",
    probability: "Probabilité de cancer détecté",
    confidence: "Niveau de confiance du modèle",
    image_section: "Image Analysée",
    image_alt: "Image médicale analysée",
    disclaimer_heading: "AVERTISSEMENT MÉDICAL IMPORTANT",
    signature_heading: "Signature du Médecin",
    stamp_heading: "Date et Cachet",
    generated_on: "Document généré le",
    reference: "Référence",
    doctor_prefix: "Dr.",
    not_provided: "Non renseigné",
};

const EN: Labels = Labels {
    report_title: "MEDICAL DIAGNOSTIC REPORT",
    subtitle: "AI-assisted diagnostic system",
    patient_section: "Patient Information",
    full_name: "Full name",
    date_of_birth: "Date of birth",
    age: "Age",
    years: "years",
    gender: "Gender",
    patient_id: "Patient ID",
    diagnostic_section: "Diagnostic Information",
    exam_date: "Examination date",
    exam_time: "Examination time",
    clinician: "Responsible physician",
    institution: "Institution",
    image_file: "Analyzed file",
    result_section: "AI Analysis Result",
    ai_assisted: "Diagnosis assisted by artificial intelligence",
    probability: "Probability of detected cancer",
    confidence: "Model confidence level",
    image_section: "Analyzed Image",
    image_alt: "Analyzed medical image",
    disclaimer_heading: "IMPORTANT MEDICAL DISCLAIMER",
    signature_heading: "Physician Signature",
    stamp_heading: "Date and Stamp",
    generated_on: "Document generated on",
    reference: "Reference",
    doctor_prefix: "Dr.",
    not_provided: "Not provided",
};

impl Locale {
    pub fn labels(&self) -> &'static Labels {
        match self {
            Locale::Fr => &FR,
            Locale::En => &EN,
        }
    }

    /// Localized calendar date.
    pub fn format_date(&self, date: NaiveDate) -> String {
        match self {
            Locale::Fr => date.format("%d/%m/%Y").to_string(),
            Locale::En => date.format("%m/%d/%Y").to_string(),
        }
    }

    /// Localized hour and minute.
    pub fn format_time(&self, at: DateTime<FixedOffset>) -> String {
        match self {
            Locale::Fr => at.format("%H:%M").to_string(),
            Locale::En => at.format("%I:%M %p").to_string(),
        }
    }

    /// Localized date and time with seconds.
    pub fn format_date_time(&self, at: DateTime<FixedOffset>) -> String {
        match self {
            Locale::Fr => at.format("%d/%m/%Y %H:%M:%S").to_string(),
            Locale::En => at.format("%m/%d/%Y, %I:%M:%S %p").to_string(),
        }
    }

    pub fn gender(&self, gender: Gender) -> &'static str {
        match (self, gender) {
            (Locale::Fr, Gender::Male) => "Masculin",
            (Locale::Fr, Gender::Female) => "Féminin",
            (Locale::En, Gender::Male) => "Male",
            (Locale::En, Gender::Female) => "Female",
        }
    }

    /// Medical disclaimer. Always part of a report.
    pub fn disclaimer(&self, model_accuracy: &str) -> String {
        match self {
            Locale::Fr => format!(
                "Ce rapport a été généré par un système d'intelligence artificielle à des fins \
                 d'aide au diagnostic uniquement. Les résultats présentés ne constituent pas un \
                 diagnostic médical définitif et ne doivent pas être utilisés comme unique base de \
                 décision thérapeutique. Une confirmation par un médecin spécialiste qualifié et des \
                 examens complémentaires sont impératifs avant toute prise de décision médicale. Ce \
                 système IA a une précision de {} sur les données de test mais peut présenter des \
                 faux positifs ou faux négatifs.",
                model_accuracy
            ),
            Locale::En => format!(
                "This report was generated by an artificial intelligence system for diagnostic \
                 assistance only. The results presented do not constitute a definitive medical \
                 diagnosis and must not be used as the sole basis for therapeutic decisions. \
                 Confirmation by a qualified specialist and additional examinations are required \
                 before any medical decision. This AI system has an accuracy of {} on test data \
                 but may produce false positives or false negatives.",
                model_accuracy
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_date_formats() {
        let date = NaiveDate::from_ymd_opt(1985, 6, 2).unwrap();
        assert_eq!(Locale::Fr.format_date(date), "02/06/1985");
        assert_eq!(Locale::En.format_date(date), "06/02/1985");
    }

    #[test]
    fn test_time_formats() {
        let t = at("2024-05-01T14:05:09+00:00");
        assert_eq!(Locale::Fr.format_time(t), "14:05");
        assert_eq!(Locale::En.format_time(t), "02:05 PM");
        assert_eq!(Locale::Fr.format_date_time(t), "01/05/2024 14:05:09");
    }

    #[test]
    fn test_gender_labels() {
        assert_eq!(Locale::Fr.gender(Gender::Male), "Masculin");
        assert_eq!(Locale::Fr.gender(Gender::Female), "Féminin");
        assert_eq!(Locale::En.gender(Gender::Female), "Female");
    }

    #[test]
    fn test_disclaimer_mentions_accuracy_and_confirmation() {
        let fr = Locale::Fr.disclaimer("95.2%");
        assert!(fr.contains("95.2%"));
        assert!(fr.contains("médecin spécialiste"));

        let en = Locale::En.disclaimer("95.2%");
        assert!(en.contains("do not constitute a definitive"));
        assert!(en.contains("qualified specialist"));
    }

    #[test]
    fn test_locale_serde() {
        assert_eq!(serde_json::to_string(&Locale::Fr).unwrap(), "\"fr\"");
        let en: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(en, Locale::En);
    }
}
