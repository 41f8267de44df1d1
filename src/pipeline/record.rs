//! The prediction record builder and an in-memory sink.

use crate::core::traits::PredictionSink;
use crate::core::TriageError;
use crate::domain::{AggregatedDiagnosis, MedicalReport, ModelFinding};
use crate::processors::{QualityAssessment, SourceFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Everything produced for one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub diagnosis: AggregatedDiagnosis,
    pub report: MedicalReport,
    pub created_at: DateTime<Utc>,
    pub quality: QualityAssessment,
    pub source_format: SourceFormat,
}

/// Flattened response body.
#[derive(Serialize)]
struct ResponseBody<'a> {
    primary_diagnosis: &'a str,
    confidence: f32,
    all_predictions: &'a BTreeMap<String, String>,
    confidence_scores: &'a BTreeMap<String, f32>,
    image_quality: f64,
    report: &'a MedicalReport,
    created_at: &'a DateTime<Utc>,
    findings: &'a [ModelFinding],
    significant_findings: &'a [String],
    multiple_findings: bool,
}

impl PredictionRecord {
    /// Assembles a record stamped with the current UTC time.
    pub fn build(
        diagnosis: AggregatedDiagnosis,
        report: MedicalReport,
        quality: QualityAssessment,
        source_format: SourceFormat,
    ) -> Self {
        Self {
            diagnosis,
            report,
            created_at: Utc::now(),
            quality,
            source_format,
        }
    }

    /// Replaces the timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Renders the response body returned to API callers.
    ///
    /// Diagnosis fields sit at the top level next to the nested `report`.
    pub fn to_response_json(&self) -> Result<serde_json::Value, TriageError> {
        let d = &self.diagnosis;
        let body = ResponseBody {
            primary_diagnosis: &d.primary_diagnosis,
            confidence: d.confidence,
            all_predictions: &d.all_predictions,
            confidence_scores: &d.confidence_scores,
            image_quality: d.image_quality,
            report: &self.report,
            created_at: &self.created_at,
            findings: &d.findings,
            significant_findings: &d.significant_findings,
            multiple_findings: d.multiple_findings,
        };
        Ok(serde_json::to_value(body)?)
    }
}

/// Keeps records in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<PredictionRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PredictionRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copies of every stored record.
    pub fn records(&self) -> Vec<PredictionRecord> {
        self.lock().clone()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no record has been stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl PredictionSink for MemorySink {
    fn persist(&self, record: &PredictionRecord) -> Result<(), TriageError> {
        self.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::domain::{FindingStatus, ReportSource, Urgency};

    pub(crate) fn pneumonia_record() -> PredictionRecord {
        let diagnosis = AggregatedDiagnosis {
            primary_diagnosis: "pneumonia".to_string(),
            confidence: 0.87,
            all_predictions: BTreeMap::from([
                ("pneumonia".to_string(), "pneumonia".to_string()),
                ("tuberculosis".to_string(), "normal".to_string()),
            ]),
            confidence_scores: BTreeMap::from([
                ("pneumonia".to_string(), 0.87),
                ("tuberculosis".to_string(), 0.12),
            ]),
            image_quality: 72.0,
            findings: vec![ModelFinding {
                disease_key: "pneumonia".to_string(),
                label: "pneumonia".to_string(),
                qualified_label: Some("pneumonia".to_string()),
                probability: 0.87,
                reported_accuracy: 0.942,
                status: FindingStatus::Positive,
                error: None,
            }],
            significant_findings: vec!["pneumonia".to_string()],
            multiple_findings: false,
        };
        let report = MedicalReport {
            summary: "Medical Image Analysis Report - Pneumonia Detected".to_string(),
            description: "Infection of the air sacs.".to_string(),
            recommendation: "High confidence prediction. Recommend immediate medical consultation."
                .to_string(),
            urgency: Urgency::High,
            symptoms: vec!["Cough".to_string()],
            causes: Vec::new(),
            treatments: vec!["Antibiotics".to_string()],
            prevention: Vec::new(),
            severity_levels: Vec::new(),
            quality_note: None,
            source: ReportSource::TemplateFallback,
            fallback_reason: Some("narrative generation disabled".to_string()),
        };
        let quality = QualityAssessment {
            score: 72.0,
            sharpness: 180.0,
            contrast: 55.0,
            brightness: 118.0,
            width: 1024,
            height: 1024,
        };
        PredictionRecord::build(diagnosis, report, quality, SourceFormat::Png)
    }
}
