//! Static disease knowledge used to fill reports.

use crate::domain::report::SeverityLevel;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Reference information for one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseKnowledge {
    /// Display name.
    pub name: &'static str,
    /// One-sentence description.
    pub description: &'static str,
    /// Typical symptoms.
    pub symptoms: &'static [&'static str],
    /// Causes and risk factors.
    pub causes: &'static [&'static str],
    /// Treatment options.
    pub treatments: &'static [&'static str],
    /// Prevention measures.
    pub prevention: &'static [&'static str],
    /// Severity stages, mildest first.
    pub severity_levels: &'static [(&'static str, &'static str)],
}

impl DiseaseKnowledge {
    /// Severity stages as owned report entries.
    pub fn severity(&self) -> Vec<SeverityLevel> {
        self.severity_levels
            .iter()
            .map(|(stage, description)| SeverityLevel {
                stage: (*stage).to_string(),
                description: (*description).to_string(),
            })
            .collect()
    }

    /// Symptoms as owned strings.
    pub fn symptom_list(&self) -> Vec<String> {
        owned(self.symptoms)
    }

    /// Causes as owned strings.
    pub fn cause_list(&self) -> Vec<String> {
        owned(self.causes)
    }

    /// Treatments as owned strings.
    pub fn treatment_list(&self) -> Vec<String> {
        owned(self.treatments)
    }

    /// Prevention measures as owned strings.
    pub fn prevention_list(&self) -> Vec<String> {
        owned(self.prevention)
    }
}

const NORMAL: DiseaseKnowledge = DiseaseKnowledge {
    name: "Normal",
    description: "No signs of pneumonia, tuberculosis, or lung cancer detected. Chest X-ray appears normal.",
    symptoms: &[],
    causes: &[],
    treatments: &[],
    prevention: &[
        "Avoid smoking and second-hand smoke",
        "Keep vaccinations up to date",
        "Seek care for a persistent cough or breathlessness",
    ],
    severity_levels: &[],
};

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

static GENERIC: DiseaseKnowledge = DiseaseKnowledge {
    name: "Unclassified Finding",
    description: "An abnormal pattern was detected that is not described in the reference table.",
    symptoms: &[],
    causes: &[],
    treatments: &["Review by a qualified radiologist"],
    prevention: &[],
    severity_levels: &[],
};

static KNOWLEDGE: Lazy<HashMap<&'static str, DiseaseKnowledge>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert("normal", NORMAL);
    table.insert(
        "pneumonia",
        DiseaseKnowledge {
            name: "Pneumonia",
            description: "An infection that inflames air sacs in one or both lungs, filling them with fluid or pus",
            symptoms: &[
                "Chest pain when breathing or coughing",
                "Cough with phlegm or pus",
                "Fever, sweating and shaking chills",
                "Shortness of breath",
                "Fatigue",
                "Nausea, vomiting or diarrhea",
            ],
            causes: &[
                "Bacterial infection, most often Streptococcus pneumoniae",
                "Viral infection such as influenza or RSV",
                "Fungal infection in people with weakened immunity",
                "Aspiration of food or fluid into the lungs",
            ],
            treatments: &[
                "Antibiotics (for bacterial pneumonia)",
                "Antiviral medications (for viral pneumonia)",
                "Rest and increased fluid intake",
                "Over-the-counter pain relievers",
                "Hospitalization if severe",
            ],
            prevention: &[
                "Pneumococcal and influenza vaccination",
                "Regular hand washing",
                "Not smoking",
            ],
            severity_levels: &[
                ("mild", "Outpatient treatment with oral antibiotics"),
                ("moderate", "May require short hospitalization"),
                ("severe", "ICU admission and intensive treatment"),
            ],
        },
    );
    table.insert(
        "tuberculosis",
        DiseaseKnowledge {
            name: "Tuberculosis (TB)",
            description: "A bacterial infection caused by Mycobacterium tuberculosis that primarily affects the lungs",
            symptoms: &[
                "Persistent cough lasting 3+ weeks",
                "Coughing up blood or sputum",
                "Chest pain or pain with breathing",
                "Unintentional weight loss",
                "Fatigue and weakness",
                "Night sweats",
                "Chills and fever",
            ],
            causes: &[
                "Airborne Mycobacterium tuberculosis from an infectious person",
                "Reactivation of latent infection",
                "Weakened immunity, including HIV infection",
            ],
            treatments: &[
                "Anti-TB medication course (6-9 months)",
                "Isoniazid, Rifampin, Pyrazinamide, Ethambutol",
                "Directly Observed Therapy (DOT)",
                "Regular monitoring and testing",
                "Isolation during infectious period",
            ],
            prevention: &[
                "BCG vaccination where recommended",
                "Screening and preventive therapy for close contacts",
                "Good ventilation in shared spaces",
            ],
            severity_levels: &[
                ("latent", "Not infectious, preventive treatment"),
                ("active", "Infectious, immediate treatment required"),
                ("drug_resistant", "Extended treatment with special drugs"),
            ],
        },
    );
    table.insert(
        "lung_cancer",
        DiseaseKnowledge {
            name: "Lung Cancer",
            description: "Cancer that begins in the lungs, often linked to smoking but can affect non-smokers",
            symptoms: &[
                "Persistent cough that gets worse",
                "Coughing up blood",
                "Shortness of breath",
                "Chest pain",
                "Hoarseness",
                "Unexplained weight loss",
                "Bone pain",
                "Headache",
            ],
            causes: &[
                "Tobacco smoking",
                "Exposure to radon, asbestos or air pollution",
                "Family history of lung cancer",
            ],
            treatments: &[
                "Surgery (lobectomy, pneumonectomy)",
                "Chemotherapy",
                "Radiation therapy",
                "Targeted therapy",
                "Immunotherapy",
                "Palliative care",
            ],
            prevention: &[
                "Not smoking, or quitting",
                "Testing homes for radon",
                "Screening with low-dose CT for high-risk adults",
            ],
            severity_levels: &[
                ("stage_1", "Early stage, confined to lung"),
                ("stage_2", "Spread to nearby lymph nodes"),
                ("stage_3", "Spread to mediastinal lymph nodes"),
                ("stage_4", "Metastatic, spread to other organs"),
            ],
        },
    );
    table.insert(
        "lung_cancer_benign",
        DiseaseKnowledge {
            name: "Benign Lung Tumor",
            description: "Non-cancerous growths in the lungs that do not spread to other parts of the body",
            symptoms: &[
                "Mild cough",
                "Shortness of breath (if large)",
                "Chest discomfort",
                "Usually asymptomatic",
            ],
            causes: &[
                "Healed infections forming granulomas",
                "Hamartomas and other developmental growths",
            ],
            treatments: &[
                "Regular monitoring",
                "Surgical removal if symptomatic",
                "Follow-up imaging",
                "No chemotherapy needed",
            ],
            prevention: &["Follow-up imaging as advised to confirm stability"],
            severity_levels: &[
                ("small", "Monitor with regular imaging"),
                ("large", "May require surgical removal"),
                ("symptomatic", "Requires intervention"),
            ],
        },
    );
    table.insert(
        "lung_cancer_malignant",
        DiseaseKnowledge {
            name: "Malignant Lung Cancer",
            description: "Cancerous growths in the lungs that can spread to other organs and require immediate treatment",
            symptoms: &[
                "Persistent cough with blood",
                "Severe shortness of breath",
                "Chest pain",
                "Rapid weight loss",
                "Fatigue",
                "Bone pain",
                "Neurological symptoms",
            ],
            causes: &[
                "Tobacco smoking",
                "Exposure to radon, asbestos or air pollution",
                "Family history of lung cancer",
            ],
            treatments: &[
                "Immediate oncology consultation",
                "Staging scans (CT, PET)",
                "Surgery if operable",
                "Chemotherapy",
                "Radiation therapy",
                "Targeted therapy",
                "Immunotherapy",
            ],
            prevention: &[
                "Not smoking, or quitting",
                "Screening with low-dose CT for high-risk adults",
            ],
            severity_levels: &[
                ("early", "T1-T2, localized, good prognosis"),
                ("advanced", "T3-T4, regional spread"),
                ("metastatic", "M1, distant metastases"),
            ],
        },
    );
    table
});

/// Looks up the entry for a diagnosis.
///
/// Tries the exact label, then the registered disease key it was qualified
/// with, then falls back to a generic entry.
pub fn knowledge_for(diagnosis: &str, disease_key: Option<&str>) -> &'static DiseaseKnowledge {
    KNOWLEDGE
        .get(diagnosis)
        .or_else(|| disease_key.and_then(|key| KNOWLEDGE.get(key)))
        .unwrap_or(&GENERIC)
}

/// Human-readable name for a diagnosis label, e.g. `lung_cancer_malignant` -> `Lung Cancer Malignant`.
pub fn display_name(label: &str) -> String {
    label
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
