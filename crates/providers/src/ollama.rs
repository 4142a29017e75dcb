//! Ollama `/api/generate` streaming client.

use std::time::Duration;

use {
    base64::Engine,
    futures::StreamExt,
    relay_common::Continuation,
    serde::{Deserialize, Serialize},
    tracing::{debug, trace, warn},
};

use crate::{
    error::{Error, Result},
    model::{ChunkStream, GenerationChunk, GenerationRequest, InferenceBackend},
    ndjson::LineBuffer,
};

/// Keep the model resident between turns.
const KEEP_ALIVE_FOREVER: i64 = -1;

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// `base_url` is `scheme://host:port`, without a trailing path.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    keep_alive: i64,
    #[serde(skip_serializing_if = "<[i64]>::is_empty")]
    context: &'a [i64],
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

impl<'a> GenerateBody<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        let (context, session) = match &request.continuation {
            Some(c) => (c.context.as_slice(), c.session.as_deref()),
            None => (&[][..], None),
        };
        Self {
            model: &request.model,
            prompt: &request.prompt,
            stream: true,
            keep_alive: KEEP_ALIVE_FOREVER,
            context,
            session,
            images: request
                .images
                .iter()
                .map(|img| base64::engine::general_purpose::STANDARD.encode(img))
                .collect(),
        }
    }
}

/// One line of the streamed response body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerateLine {
    Failure {
        error: String,
    },
    Chunk {
        response: String,
        done: bool,
        #[serde(default)]
        context: Vec<i64>,
        #[serde(default)]
        session: Option<String>,
    },
}

fn decode_line(line: &[u8]) -> Result<GenerationChunk> {
    let parsed: GenerateLine = serde_json::from_slice(line)
        .map_err(|e| Error::malformed(String::from_utf8_lossy(line), e))?;
    match parsed {
        GenerateLine::Failure { error } => Err(Error::Backend { message: error }),
        GenerateLine::Chunk {
            response,
            done: true,
            context,
            session,
        } => Ok(GenerationChunk::done(response, Continuation { context, session })),
        GenerateLine::Chunk { response, .. } => Ok(GenerationChunk::delta(response)),
    }
}

impl InferenceBackend for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn generate(&self, request: GenerationRequest) -> ChunkStream<'_> {
        Box::pin(async_stream::stream! {
            let body = GenerateBody::from_request(&request);
            debug!(
                model = %request.model,
                prompt_len = request.prompt.len(),
                context_len = body.context.len(),
                has_session = body.session.is_some(),
                images = body.images.len(),
                "ollama generate request"
            );

            let resp = match self
                .client
                .post(format!("{}/api/generate", self.base_url))
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "ollama request failed");
                    yield Err(Error::from(e));
                    return;
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let body_text = resp.text().await.unwrap_or_default();
                yield Err(Error::Status { status: status.as_u16(), body: body_text });
                return;
            }

            let mut byte_stream = resp.bytes_stream();
            let mut lines = LineBuffer::new();
            let mut chunks: usize = 0;

            while let Some(read) = byte_stream.next().await {
                let bytes = match read {
                    Ok(b) => b,
                    Err(e) => {
                        yield Err(Error::from(e));
                        return;
                    }
                };
                for line in lines.push(&bytes) {
                    match decode_line(&line) {
                        Ok(chunk) => {
                            chunks += 1;
                            let done = chunk.done;
                            trace!(delta_len = chunk.delta.len(), done, "ollama chunk");
                            yield Ok(chunk);
                            if done {
                                debug!(chunks, "ollama generation complete");
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            // A final line without a trailing newline.
            if let Some(line) = lines.finish() {
                match decode_line(&line) {
                    Ok(chunk) if chunk.done => {
                        yield Ok(chunk);
                        return;
                    }
                    Ok(chunk) => yield Ok(chunk),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            yield Err(Error::Truncated);
        })
    }
}
