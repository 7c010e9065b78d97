//! Tipos de dados trocados com o backend de jobs.
//!
//! Todas as structs derivam `Serialize` e `Deserialize` conforme o contrato
//! dos endpoints `POST /jobs`, `GET /jobs/{id}` e
//! `GET /projects/{id}/artifacts`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tipo de fonte aceito pelo job de ingestão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Youtube,
    Audio,
    Video,
    Pdf,
    Pptx,
    Md,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Youtube => "youtube",
            SourceKind::Audio => "audio",
            SourceKind::Video => "video",
            SourceKind::Pdf => "pdf",
            SourceKind::Pptx => "pptx",
            SourceKind::Md => "md",
        };
        f.write_str(name)
    }
}

/// Tipo de material gerado a partir do núcleo de conhecimento.
///
/// O conjunto é fixo: toda execução dispara exatamente um job de geração
/// para cada valor em [`TargetKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Quiz,
    Notes,
    Slides,
    Flashcards,
    Exam,
}

impl TargetKind {
    /// Todos os alvos de geração, na ordem em que são disparados.
    pub const ALL: [TargetKind; 5] = [
        TargetKind::Quiz,
        TargetKind::Notes,
        TargetKind::Slides,
        TargetKind::Flashcards,
        TargetKind::Exam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Quiz => "quiz",
            TargetKind::Notes => "notes",
            TargetKind::Slides => "slides",
            TargetKind::Flashcards => "flashcards",
            TargetKind::Exam => "exam",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tipo de job no backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Ingest,
    Generate,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Ingest => f.write_str("ingest"),
            JobKind::Generate => f.write_str("generate"),
        }
    }
}

/// Payload de um job `ingest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestPayload {
    pub source_type: SourceKind,
    /// URL ou caminho do arquivo.
    pub source_ref: String,
    pub original_name: String,
}

/// Payload de um job `generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratePayload {
    /// Identificador do núcleo de conhecimento produzido pela ingestão.
    pub source_artifact_id: String,
    pub target_type: TargetKind,
}

/// Payload de submissão. Serializado sem tag: o tipo vai no campo `type`
/// de [`CreateJobRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobPayload {
    Ingest(IngestPayload),
    Generate(GeneratePayload),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Ingest(_) => JobKind::Ingest,
            JobPayload::Generate(_) => JobKind::Generate,
        }
    }
}

/// Corpo da requisição para `POST /jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateJobRequest<'a> {
    pub project_id: &'a str,
    #[serde(rename = "type")]
    pub job_type: JobKind,
    pub payload: &'a JobPayload,
}

/// Resposta de `POST /jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreated {
    pub job_id: String,
}

/// Identifica um job submetido. Imutável depois de criado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub kind: JobKind,
    pub payload: JobPayload,
}

impl JobHandle {
    pub fn new(id: String, payload: JobPayload) -> Self {
        Self {
            id,
            kind: payload.kind(),
            payload,
        }
    }
}

/// Status de um job conforme reportado pelo backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Resposta de `GET /jobs/{id}`.
///
/// Apenas `status` é obrigatório; os demais campos são tolerados ausentes
/// para não acoplar o cliente a detalhes do backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusReport {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Serializado como "type" no JSON.
    #[serde(default, rename = "type")]
    pub job_type: Option<String>,
    pub status: RemoteStatus,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobStatusReport {
    /// Relatório mínimo com apenas o status preenchido.
    pub fn with_status(status: RemoteStatus) -> Self {
        Self {
            id: None,
            project_id: None,
            job_type: None,
            status,
            payload: None,
            result: None,
            error_message: None,
        }
    }

    pub fn completed(result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::with_status(RemoteStatus::Completed)
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::with_status(RemoteStatus::Failed)
        }
    }

    /// `result.core_artifact_id` de um job de ingestão.
    pub fn core_artifact_id(&self) -> Option<&str> {
        self.result_field("core_artifact_id")
    }

    /// `result.artifact_id` de um job de geração.
    pub fn artifact_id(&self) -> Option<&str> {
        self.result_field("artifact_id")
    }

    // Strings vazias contam como ausentes.
    fn result_field(&self, key: &str) -> Option<&str> {
        self.result
            .as_ref()?
            .get(key)?
            .as_str()
            .filter(|value| !value.is_empty())
    }
}

/// Um artefato persistido do projeto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    /// Serializado como "type" no JSON (ex.: "knowledge_core", "quiz").
    #[serde(rename = "type")]
    pub artifact_type: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Aresta de derivação entre dois artefatos (origem → gerado).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEdge {
    #[serde(default)]
    pub parent_artifact_id: String,
    #[serde(default)]
    pub child_artifact_id: String,
}

/// Resposta de `GET /projects/{id}/artifacts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactListing {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub edges: Vec<ArtifactEdge>,
}

impl ArtifactListing {
    pub fn find(&self, artifact_id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.id == artifact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_job_request_matches_backend_contract() {
        let payload = JobPayload::Ingest(IngestPayload {
            source_type: SourceKind::Youtube,
            source_ref: "https://youtu.be/abc".into(),
            original_name: "Lecture 1".into(),
        });
        let req = CreateJobRequest {
            project_id: "p-1",
            job_type: payload.kind(),
            payload: &payload,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "project_id": "p-1",
                "type": "ingest",
                "payload": {
                    "source_type": "youtube",
                    "source_ref": "https://youtu.be/abc",
                    "original_name": "Lecture 1"
                }
            })
        );
    }

    #[test]
    fn generate_payload_serializes_target_lowercase() {
        let payload = JobPayload::Generate(GeneratePayload {
            source_artifact_id: "core-42".into(),
            target_type: TargetKind::Flashcards,
        });
        assert_eq!(payload.kind(), JobKind::Generate);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"source_artifact_id": "core-42", "target_type": "flashcards"})
        );
    }

    #[test]
    fn untagged_payload_picks_the_matching_shape() {
        let generate: JobPayload =
            serde_json::from_value(json!({"source_artifact_id": "c", "target_type": "exam"}))
                .unwrap();
        assert_eq!(generate.kind(), JobKind::Generate);

        let ingest: JobPayload = serde_json::from_value(
            json!({"source_type": "pdf", "source_ref": "a.pdf", "original_name": "A"}),
        )
        .unwrap();
        assert_eq!(ingest.kind(), JobKind::Ingest);
    }

    #[test]
    fn status_report_deserialize_from_api_format() {
        let api_json = r#"{
            "id": "j-1",
            "project_id": "p-1",
            "type": "ingest",
            "status": "completed",
            "payload": {"source_type": "youtube"},
            "result": {"source_artifact_id": "src-1", "core_artifact_id": "core-42"},
            "error_message": null
        }"#;
        let report: JobStatusReport = serde_json::from_str(api_json).unwrap();
        assert_eq!(report.status, RemoteStatus::Completed);
        assert_eq!(report.core_artifact_id(), Some("core-42"));
        assert_eq!(report.artifact_id(), None);
        assert_eq!(report.error_message, None);
    }

    #[test]
    fn status_report_tolerates_minimal_body() {
        let report: JobStatusReport = serde_json::from_str(r#"{"status": "running"}"#).unwrap();
        assert_eq!(report, JobStatusReport::with_status(RemoteStatus::Running));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result = serde_json::from_str::<JobStatusReport>(r#"{"status": "exploded"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_identifiers_count_as_absent() {
        let report = JobStatusReport::completed(json!({"core_artifact_id": ""}));
        assert_eq!(report.core_artifact_id(), None);

        let report = JobStatusReport::completed(json!({"artifact_id": 7}));
        assert_eq!(report.artifact_id(), None);
    }

    #[test]
    fn artifact_listing_finds_by_id() {
        let listing: ArtifactListing = serde_json::from_value(json!({
            "artifacts": [
                {"id": "a-1", "type": "knowledge_core", "content": {}},
                {"id": "a-2", "type": "quiz", "content": {"kind": "generated"}}
            ],
            "edges": [{"parent_artifact_id": "a-1", "child_artifact_id": "a-2"}]
        }))
        .unwrap();
        assert_eq!(listing.find("a-2").unwrap().artifact_type, "quiz");
        assert!(listing.find("a-3").is_none());
        assert_eq!(listing.edges[0].parent_artifact_id, "a-1");
    }

    #[test]
    fn target_kind_order_and_display() {
        let names: Vec<String> = TargetKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["quiz", "notes", "slides", "flashcards", "exam"]);
        assert_eq!(SourceKind::Pptx.to_string(), "pptx");
    }
}
