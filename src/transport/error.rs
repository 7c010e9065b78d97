//! Tipos de erro para o cliente da API de jobs.
//!
//! Define [`TransportError`] com variantes para respostas HTTP de erro,
//! falhas de rede e corpos de resposta malformados. Nenhuma variante é
//! retentada automaticamente: quem chama decide o que fazer.

use thiserror::Error;

/// Erros que podem ocorrer ao falar com o backend de jobs.
///
/// - [`Api`](TransportError::Api): o servidor respondeu com status não-2xx
/// - [`Network`](TransportError::Network): falha na camada de rede
/// - [`MalformedBody`](TransportError::MalformedBody): JSON inválido ou fora do contrato
/// - [`MissingField`](TransportError::MissingField): campo obrigatório vazio
#[derive(Debug, Error)]
pub enum TransportError {
    /// Erro retornado pela API (ex.: 400 payload inválido, 404 job inexistente).
    /// Contém o código HTTP e o corpo da resposta como mensagem.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// O corpo da resposta não pôde ser decodificado.
    #[error("malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    /// O corpo foi decodificado, mas um campo obrigatório veio vazio.
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}
