//! The learner record accepted by the prediction service.
//!
//! Field names on the wire are the keys the front end sends; the Rust names
//! describe what each attribute means. Deserialization is the boundary
//! validator: a missing or mistyped required field never reaches the encoder.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerRecord {
    /// "Masculino" / "Femenino", compared case-insensitively.
    #[serde(rename = "genero")]
    pub gender: String,
    #[serde(rename = "campesino")]
    pub is_rural_worker: bool,
    /// Socioeconomic stratum, nominally 0 to 6.
    #[serde(rename = "estrato")]
    pub socioeconomic_stratum: i64,
    /// Highest completed education level, e.g. "Educación Media".
    #[serde(rename = "nivel_educacion")]
    pub education_level: String,
    #[serde(rename = "discapacidad")]
    pub has_disability: bool,
    /// "Virtual" / "Híbrida".
    #[serde(rename = "tipo_formacion")]
    pub training_modality: String,
    #[serde(rename = "victima_conflicto")]
    pub is_conflict_victim: bool,
    #[serde(rename = "tiempo_segundos")]
    pub elapsed_seconds: f64,
    #[serde(rename = "puntaje_eje")]
    pub thematic_axis_score: f64,
    /// Free text, matched against the canonical ethnic groups by substring.
    #[serde(rename = "autoidentificacion_etnica")]
    pub ethnic_self_identification: String,
    /// Free text, matched against the canonical thematic axes by substring.
    #[serde(rename = "eje_final")]
    pub final_axis: String,
    /// "Básico" / "Avanzado", compared case-insensitively.
    #[serde(rename = "nivel")]
    pub level: String,

    // Optional overrides for the derived averages. `null` and absence are equivalent.
    #[serde(rename = "promedio_lineas", default)]
    pub avg_lines: Option<f64>,
    #[serde(rename = "promedio_areas", default)]
    pub avg_areas: Option<f64>,
}

impl LearnerRecord {
    /// Wire key of the first numeric field holding NaN or an infinity.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("tiempo_segundos", Some(self.elapsed_seconds)),
            ("puntaje_eje", Some(self.thematic_axis_score)),
            ("promedio_lineas", self.avg_lines),
            ("promedio_areas", self.avg_areas),
        ]
        .into_iter()
        .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
        .map(|(key, _)| key)
    }
}
