//! Tipos de erro para o cliente dos backends de geração.
//!
//! Toda falha de transporte (timeout, rede, HTTP fora de 2xx, corpo
//! malformado) vira uma única [`BackendError`]. Quem chama nunca recebe um
//! sucesso parcialmente decodificado.

use thiserror::Error;

/// Erros que podem ocorrer ao falar com um backend de geração.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A chave de modelo não existe no catálogo configurado.
    #[error("unknown model `{0}`")]
    UnknownModel(String),

    /// A requisição estourou o timeout configurado.
    #[error("request timed out")]
    Timeout,

    /// O backend respondeu com status HTTP fora da faixa 2xx.
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// O corpo da resposta não corresponde ao formato esperado.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Falha de rede subjacente (DNS, conexão recusada, conexão resetada).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Network(err)
        }
    }
}
