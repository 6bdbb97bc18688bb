//! Tipos de dados trocados com os backends de geração de vídeo.
//!
//! As structs seguem o contrato HTTP comum a todos os backends:
//! `POST /generate`, `GET /jobs/{id}` e `GET /info`. Campos ausentes na
//! resposta usam defaults em vez de falhar a decodificação.

use serde::{Deserialize, Deserializer, Serialize};

use crate::jobs::JobStatus;

/// Corpo da requisição para `POST {base}/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Duração do vídeo em segundos.
    pub duration: u32,
    pub fps: u32,
    /// Resolução no formato `LARGURAxALTURA`.
    pub resolution: String,
    pub guidance_scale: f64,
    /// Seed opcional; omitida do JSON quando ausente.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Resposta de `POST {base}/generate`: o job aceito pelo backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Identificador opaco atribuído pelo backend.
    pub job_id: String,
    /// Status inicial; `queued` quando o backend não informa.
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub queue_position: Option<u32>,
    #[serde(default)]
    pub estimated_time_seconds: Option<u64>,
}

/// Resposta de `GET {base}/jobs/{id}`.
///
/// O backend devolve mais campos (prompt, timestamps); só os que o
/// coordenador mescla no registro do job são decodificados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusUpdate {
    #[serde(default)]
    pub status: JobStatus,
    /// Percentual 0–100. Valores fracionários são arredondados e valores
    /// fora da faixa são limitados.
    #[serde(default, deserialize_with = "percent")]
    pub progress: Option<u8>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
}

fn percent<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, 100.0) as u8))
}

/// Resposta bruta de `GET {base}/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoResponse {
    #[serde(default)]
    pub model: Option<ModelInfo>,
    #[serde(default)]
    pub system: Option<SystemInfo>,
    #[serde(default)]
    pub queue_size: Option<u32>,
    #[serde(default)]
    pub total_jobs: Option<u32>,
}

/// Bloco `model` de `/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub quantization: Option<String>,
}

/// Bloco `system` de `/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInfo {
    #[serde(default)]
    pub gpu_memory: Option<GpuMemory>,
}

/// Uso de memória da GPU reportado pelo backend, em GB.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GpuMemory {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub allocated_gb: Option<f64>,
    #[serde(default)]
    pub total_gb: Option<f64>,
}

/// Capacidades de um backend alcançável, extraídas de `/info`.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    pub model_loaded: bool,
    /// Memória de GPU em uso (GB); `None` quando o backend não tem GPU.
    pub memory_used_gb: Option<f64>,
    pub memory_total_gb: Option<f64>,
    pub quantization: Option<String>,
    pub queue_size: Option<u32>,
    pub total_jobs: Option<u32>,
}

impl From<InfoResponse> for HealthSnapshot {
    fn from(info: InfoResponse) -> Self {
        let model = info.model.unwrap_or_default();
        let gpu = info
            .system
            .and_then(|s| s.gpu_memory)
            .filter(|g| g.available);
        Self {
            model_loaded: model.loaded,
            memory_used_gb: gpu.as_ref().map(|g| g.allocated_gb.unwrap_or(0.0)),
            memory_total_gb: gpu.as_ref().map(|g| g.total_gb.unwrap_or(0.0)),
            quantization: model.quantization,
            queue_size: info.queue_size,
            total_jobs: info.total_jobs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_request_omits_missing_seed() {
        let req = GenerationRequest {
            prompt: "a cat".into(),
            duration: 5,
            fps: 24,
            resolution: "1024x576".into(),
            guidance_scale: 7.5,
            seed: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("seed"));

        let with_seed = GenerationRequest {
            seed: Some(42),
            ..req
        };
        let json = serde_json::to_string(&with_seed).unwrap();
        assert!(json.contains(r#""seed":42"#));
    }

    #[test]
    fn job_handle_defaults_status_to_queued() {
        let handle: JobHandle = serde_json::from_str(r#"{"job_id":"abc123"}"#).unwrap();
        assert_eq!(handle.job_id, "abc123");
        assert_eq!(handle.status, JobStatus::Queued);
        assert_eq!(handle.queue_position, None);
    }

    #[test]
    fn job_handle_deserialize_from_api_format() {
        let json = r#"{
            "job_id": "waver-cf98097a",
            "status": "queued",
            "queue_position": 2,
            "estimated_time_seconds": 120,
            "model_loaded": true
        }"#;
        let handle: JobHandle = serde_json::from_str(json).unwrap();
        assert_eq!(handle.job_id, "waver-cf98097a");
        assert_eq!(handle.queue_position, Some(2));
        assert_eq!(handle.estimated_time_seconds, Some(120));
    }

    #[test]
    fn status_update_deserialize_from_api_format() {
        let json = r#"{
            "job_id": "waver-cf98097a",
            "model_name": "waver",
            "status": "processing",
            "prompt": "a cat",
            "progress": 40,
            "error": null,
            "output_path": null
        }"#;
        let update: JobStatusUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.status, JobStatus::Processing);
        assert_eq!(update.progress, Some(40));
        assert_eq!(update.error, None);
    }

    #[test]
    fn status_update_rounds_and_clamps_progress() {
        let update: JobStatusUpdate =
            serde_json::from_str(r#"{"status":"processing","progress":39.6}"#).unwrap();
        assert_eq!(update.progress, Some(40));

        let update: JobStatusUpdate =
            serde_json::from_str(r#"{"status":"processing","progress":250}"#).unwrap();
        assert_eq!(update.progress, Some(100));

        let update: JobStatusUpdate = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(update.progress, None);
    }

    #[test]
    fn status_update_rejects_non_numeric_progress() {
        let parsed = serde_json::from_str::<JobStatusUpdate>(r#"{"progress":"forty"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn health_snapshot_from_info_with_gpu() {
        let json = r#"{
            "model": {"model_name": "waver", "loaded": true, "quantization": "fp8"},
            "system": {"gpu_memory": {"available": true, "allocated_gb": 15.2, "total_gb": 128.0}},
            "queue_size": 1,
            "total_jobs": 7
        }"#;
        let info: InfoResponse = serde_json::from_str(json).unwrap();
        let snapshot = HealthSnapshot::from(info);
        assert!(snapshot.model_loaded);
        assert_eq!(snapshot.memory_used_gb, Some(15.2));
        assert_eq!(snapshot.memory_total_gb, Some(128.0));
        assert_eq!(snapshot.quantization.as_deref(), Some("fp8"));
        assert_eq!(snapshot.total_jobs, Some(7));
    }

    #[test]
    fn health_snapshot_without_gpu() {
        let json = r#"{"model": {"loaded": false}, "system": {"gpu_memory": {"available": false}}}"#;
        let info: InfoResponse = serde_json::from_str(json).unwrap();
        let snapshot = HealthSnapshot::from(info);
        assert!(!snapshot.model_loaded);
        assert_eq!(snapshot.memory_used_gb, None);
        assert_eq!(snapshot.memory_total_gb, None);
    }
}
