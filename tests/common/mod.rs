//! Shared fixture: a complete set of artifacts plus a service manifest,
//! written into a temporary directory.

use exito::config::ServiceConfig;
use exito::encoder::{EncoderDefaults, columns};
use exito::model::{ClassifierArtifact, DecisionTree, KBestSelector, Node, RandomForest, SplitRule};
use exito::schema::FeatureSchema;
use std::path::PathBuf;
use tempfile::TempDir;

/// Columns in trained order, including the historical `lineas_*` family the
/// encoder never populates.
pub fn trained_columns() -> Vec<String> {
    [
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
        "lineas_Cultura digital",
        "lineas_Programación",
        columns::ETHNIC_INDIGENOUS,
        columns::ETHNIC_AFRO,
        columns::ETHNIC_NONE,
        columns::ETHNIC_ROMA,
        columns::AXIS_DATA_ANALYSIS,
        columns::AXIS_CLOUD,
        columns::AXIS_AI,
        columns::AXIS_PROGRAMMING,
        columns::LEVEL_ADVANCED,
        columns::LEVEL_BASIC,
        columns::AVG_LINES,
        columns::AVG_AREAS,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Selected columns: gender, virtual modality, thematic score, advanced
/// level and the average-lines column.
pub const SELECTED: [usize; 5] = [0, 7, 9, 20, 22];

/// Two stumps: one on the thematic score, one on the advanced level.
/// A record scoring above 60 at the basic level gets (0.8 + 0.3) / 2.
pub fn forest() -> RandomForest {
    let stump = |feature: usize, threshold: f64, low: f64, high: f64| DecisionTree {
        nodes: vec![
            Node::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: low },
            Node::Leaf { value: high },
        ],
    };
    RandomForest {
        n_features: SELECTED.len(),
        split_rule: SplitRule::LessOrEqual,
        trees: vec![stump(2, 60.0, 0.2, 0.8), stump(3, 0.5, 0.3, 0.9)],
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub config_path: PathBuf,
}

/// Writes schema, selector, classifier and `service.toml` into a fresh
/// temporary directory. The manifest uses relative artifact paths.
pub fn write_fixture(defaults: EncoderDefaults) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let columns = trained_columns();

    FeatureSchema::new(columns.clone())
        .unwrap()
        .save(dir.path().join("columnas_originales.toml"))
        .unwrap();

    KBestSelector {
        input_width: columns.len(),
        selected: SELECTED.to_vec(),
        feature_names_in: Some(columns),
    }
    .save(dir.path().join("selector_kbest.toml"))
    .unwrap();

    ClassifierArtifact::RandomForest(forest())
        .save(dir.path().join("modelo.toml"))
        .unwrap();

    let config_path = dir.path().join("service.toml");
    ServiceConfig {
        schema: PathBuf::from("columnas_originales.toml"),
        selector: PathBuf::from("selector_kbest.toml"),
        model: PathBuf::from("modelo.toml"),
        defaults,
    }
    .save(&config_path)
    .unwrap();

    Fixture { dir, config_path }
}

/// The learner used in the end-to-end scenario.
pub const SCENARIO_BODY: &str = r#"{
    "genero": "Femenino",
    "campesino": false,
    "estrato": 3,
    "nivel_educacion": "Educación Universitaria Pregrado",
    "discapacidad": false,
    "tipo_formacion": "Virtual",
    "victima_conflicto": false,
    "tiempo_segundos": 1200.0,
    "puntaje_eje": 78.5,
    "autoidentificacion_etnica": "Ningún grupo étnico",
    "eje_final": "Programación",
    "nivel": "Básico"
}"#;
