//! # Feature Encoder
//!
//! Turns one `LearnerRecord` into a `FeatureRow` laid out exactly like the
//! training-time feature space: every schema column present once, in schema
//! order, zero unless an encoding rule touches it.
//!
//! Column names are resolved against the schema once, when the encoder is
//! built. A column the schema does not define is simply never written, which
//! lets one encoder serve several schema versions. Encoding itself never fails:
//! unrecognized free text and categorical values fall back to a default.

use crate::record::LearnerRecord;
use crate::schema::FeatureSchema;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Canonical column names of the training-time feature space.
pub mod columns {
    pub const GENDER: &str = "Genero";
    pub const RURAL_WORKER: &str = "Campesino";
    pub const STRATUM: &str = "Estrato";
    // The capitalization matches the trained schema.
    pub const EDUCATION_LEVEL: &str = "NIvel_educacion";
    pub const DISABILITY: &str = "Discapacidad";
    pub const CONFLICT_VICTIM: &str = "Victima_del_conflicto";
    pub const MODALITY_HYBRID: &str = "Tipo_formacion";
    pub const MODALITY_VIRTUAL: &str = "Tipo_de_formacion_Virtual";
    pub const ELAPSED_SECONDS: &str = "tiempo_segundos";
    pub const THEMATIC_SCORE: &str = "Puntaje_eje_tematico_selecionado";

    pub const ETHNIC_INDIGENOUS: &str = "etnica_Indígena";
    pub const ETHNIC_AFRO: &str = "etnica_Negro, Mulato, Afrodescendiente, Afrocolombiano";
    pub const ETHNIC_ROMA: &str = "etnica_Rrom o gitano";
    pub const ETHNIC_NONE: &str = "etnica_Ningún grupo étnico";

    pub const AXIS_DATA_ANALYSIS: &str = "eje_final_Análisis de Datos";
    pub const AXIS_CLOUD: &str = "eje_final_Arquitectura en la nube";
    pub const AXIS_AI: &str = "eje_final_Inteligencia artificial";
    pub const AXIS_PROGRAMMING: &str = "eje_final_Programación";

    pub const LEVEL_ADVANCED: &str = "Nivel_Avanzado";
    pub const LEVEL_BASIC: &str = "Nivel_Básico";

    pub const AVG_LINES: &str = "promedio_lineas";
    pub const AVG_AREAS: &str = "promedio_areas";
}

/// Ordinal table for `nivel_educacion`. The bare level name (without the
/// "Educación " prefix) maps to the same ordinal.
const EDUCATION_LEVELS: [(&str, f64); 7] = [
    ("Educación Primaria", 1.0),
    ("Educación Media", 2.0),
    ("Educación Secundaria Básica", 3.0),
    ("Educación Técnica Profesional", 4.0),
    ("Educación Tecnológica", 5.0),
    ("Educación Universitaria Pregrado", 6.0),
    ("Especialización", 7.0),
];
const EDUCATION_PREFIX: &str = "Educación ";
const DEFAULT_EDUCATION_LEVEL: f64 = 3.0;

const MODALITY_HYBRID_LABEL: &str = "Híbrida";
const MODALITY_VIRTUAL_LABEL: &str = "Virtual";

/// Ethnic groups in priority order; the first group with a marker contained in
/// the lower-cased text wins. No match selects `ETHNIC_NONE`.
const ETHNIC_GROUPS: [(&[&str], &str); 3] = [
    (INDIGENOUS_MARKERS, columns::ETHNIC_INDIGENOUS),
    (AFRO_MARKERS, columns::ETHNIC_AFRO),
    (ROMA_MARKERS, columns::ETHNIC_ROMA),
];
const INDIGENOUS_MARKERS: &[&str] = &["indígena"];
const AFRO_MARKERS: &[&str] = &["negro", "afro"];
const ROMA_MARKERS: &[&str] = &["rrom", "gitano"];

/// Final thematic axes in priority order. There is no catch-all column: text
/// that matches no marker leaves the whole group at zero.
const FINAL_AXES: [(&str, &str); 4] = [
    ("análisis", columns::AXIS_DATA_ANALYSIS),
    ("arquitectura", columns::AXIS_CLOUD),
    ("inteligencia", columns::AXIS_AI),
    ("programación", columns::AXIS_PROGRAMMING),
];

/// Fallback values for the derived-average columns, used when the caller does
/// not supply an override. Fixed for the lifetime of the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderDefaults {
    #[serde(rename = "promedio_lineas", default)]
    pub avg_lines: f64,
    #[serde(rename = "promedio_areas", default)]
    pub avg_areas: f64,
}

/// One encoded row. Values are stored in schema order.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    schema: Arc<FeatureSchema>,
    values: Array1<f64>,
}

impl FeatureRow {
    /// A row with every schema column set to zero.
    pub fn zeros(schema: Arc<FeatureSchema>) -> Self {
        let values = Array1::zeros(schema.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Values in schema order, ready for the selector.
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    /// Value of a named column, or `None` if the schema does not define it.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.index_of(name).map(|idx| self.values[idx])
    }

    /// `(column, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.schema
            .columns()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    fn set(&mut self, slot: Option<usize>, value: f64) {
        if let Some(idx) = slot {
            self.values[idx] = value;
        }
    }
}

/// Schema positions of every column the encoder writes, resolved once.
#[derive(Debug, Clone)]
struct ColumnSlots {
    gender: Option<usize>,
    rural_worker: Option<usize>,
    stratum: Option<usize>,
    education_level: Option<usize>,
    disability: Option<usize>,
    conflict_victim: Option<usize>,
    modality_hybrid: Option<usize>,
    modality_virtual: Option<usize>,
    elapsed_seconds: Option<usize>,
    thematic_score: Option<usize>,
    ethnic_groups: [Option<usize>; 3],
    ethnic_none: Option<usize>,
    final_axes: [Option<usize>; 4],
    level_advanced: Option<usize>,
    level_basic: Option<usize>,
    avg_lines: Option<usize>,
    avg_areas: Option<usize>,
}

impl ColumnSlots {
    fn resolve(schema: &FeatureSchema) -> Self {
        let slot = |name: &str| schema.index_of(name);
        Self {
            gender: slot(columns::GENDER),
            rural_worker: slot(columns::RURAL_WORKER),
            stratum: slot(columns::STRATUM),
            education_level: slot(columns::EDUCATION_LEVEL),
            disability: slot(columns::DISABILITY),
            conflict_victim: slot(columns::CONFLICT_VICTIM),
            modality_hybrid: slot(columns::MODALITY_HYBRID),
            modality_virtual: slot(columns::MODALITY_VIRTUAL),
            elapsed_seconds: slot(columns::ELAPSED_SECONDS),
            thematic_score: slot(columns::THEMATIC_SCORE),
            ethnic_groups: ETHNIC_GROUPS.map(|(_, column)| slot(column)),
            ethnic_none: slot(columns::ETHNIC_NONE),
            final_axes: FINAL_AXES.map(|(_, column)| slot(column)),
            level_advanced: slot(columns::LEVEL_ADVANCED),
            level_basic: slot(columns::LEVEL_BASIC),
            avg_lines: slot(columns::AVG_LINES),
            avg_areas: slot(columns::AVG_AREAS),
        }
    }
}

/// Every column name the encoder knows how to populate.
fn known_columns() -> Vec<&'static str> {
    let mut known = vec![
        columns::GENDER,
        columns::RURAL_WORKER,
        columns::STRATUM,
        columns::EDUCATION_LEVEL,
        columns::DISABILITY,
        columns::CONFLICT_VICTIM,
        columns::MODALITY_HYBRID,
        columns::MODALITY_VIRTUAL,
        columns::ELAPSED_SECONDS,
        columns::THEMATIC_SCORE,
        columns::ETHNIC_NONE,
        columns::LEVEL_ADVANCED,
        columns::LEVEL_BASIC,
        columns::AVG_LINES,
        columns::AVG_AREAS,
    ];
    known.extend(ETHNIC_GROUPS.map(|(_, column)| column));
    known.extend(FINAL_AXES.map(|(_, column)| column));
    known
}

/// Stateless record-to-row encoder bound to one schema.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: Arc<FeatureSchema>,
    slots: ColumnSlots,
    defaults: EncoderDefaults,
}

impl FeatureEncoder {
    pub fn new(schema: Arc<FeatureSchema>, defaults: EncoderDefaults) -> Self {
        let absent: Vec<&str> = known_columns()
            .into_iter()
            .filter(|name| !schema.contains(name))
            .collect();
        if !absent.is_empty() {
            log::warn!(
                "Feature schema does not define {} encoder column(s); they will be skipped: {:?}",
                absent.len(),
                absent
            );
        }

        let slots = ColumnSlots::resolve(&schema);
        Self {
            schema,
            slots,
            defaults,
        }
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn defaults(&self) -> EncoderDefaults {
        self.defaults
    }

    /// Encodes one record into a full-width row in schema order.
    pub fn encode(&self, record: &LearnerRecord) -> FeatureRow {
        let slots = &self.slots;
        let mut row = FeatureRow::zeros(Arc::clone(&self.schema));

        // --- Binary and ordinal fields ---
        row.set(slots.gender, indicator(record.gender.to_lowercase() == "masculino"));
        row.set(slots.rural_worker, indicator(record.is_rural_worker));
        row.set(slots.stratum, record.socioeconomic_stratum as f64);
        row.set(
            slots.education_level,
            education_ordinal(&record.education_level),
        );
        row.set(slots.disability, indicator(record.has_disability));
        row.set(slots.conflict_victim, indicator(record.is_conflict_victim));

        // --- Training modality: two independent indicators ---
        row.set(
            slots.modality_hybrid,
            indicator(record.training_modality == MODALITY_HYBRID_LABEL),
        );
        row.set(
            slots.modality_virtual,
            indicator(record.training_modality == MODALITY_VIRTUAL_LABEL),
        );

        // --- Continuous passthrough ---
        row.set(slots.elapsed_seconds, record.elapsed_seconds);
        row.set(slots.thematic_score, record.thematic_axis_score);

        // --- Ethnicity one-hot, with a catch-all column ---
        let ethnicity = record.ethnic_self_identification.to_lowercase();
        let ethnic_slot = ETHNIC_GROUPS
            .iter()
            .position(|(markers, _)| markers.iter().any(|m| ethnicity.contains(m)))
            .map_or(slots.ethnic_none, |group| slots.ethnic_groups[group]);
        row.set(ethnic_slot, 1.0);

        // --- Final axis one-hot, no catch-all ---
        let axis = record.final_axis.to_lowercase();
        if let Some(position) = FINAL_AXES
            .iter()
            .position(|(marker, _)| axis.contains(marker))
        {
            row.set(slots.final_axes[position], 1.0);
        }

        // --- Level: exactly one of the pair ---
        let advanced = record.level.to_lowercase() == "avanzado";
        row.set(slots.level_advanced, indicator(advanced));
        row.set(slots.level_basic, indicator(!advanced));

        // --- Derived averages: fallback first, then the caller's override ---
        row.set(slots.avg_lines, self.defaults.avg_lines);
        row.set(slots.avg_areas, self.defaults.avg_areas);
        if let Some(value) = record.avg_lines {
            row.set(slots.avg_lines, value);
        }
        if let Some(value) = record.avg_areas {
            row.set(slots.avg_areas, value);
        }

        row
    }
}

#[inline]
fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

fn education_ordinal(label: &str) -> f64 {
    EDUCATION_LEVELS
        .iter()
        .find(|(name, _)| *name == label || name.strip_prefix(EDUCATION_PREFIX) == Some(label))
        .map_or(DEFAULT_EDUCATION_LEVEL, |&(_, ordinal)| ordinal)
}
