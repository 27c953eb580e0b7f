use super::error::OracleError;
use base64::Engine as _;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Image bytes ready for an inline `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: &'static str,
    pub base64: String,
}

impl EncodedImage {
    pub fn from_bytes(bytes: &[u8], mime: &'static str) -> Self {
        Self {
            mime,
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, OracleError> {
        let bytes = fs::read(path).map_err(|source| OracleError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_bytes(&bytes, mime_for(path)))
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }

    pub fn decode(&self) -> Option<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.base64)
            .ok()
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// One logical oracle call: a prompt plus images in order.
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub images: &'a [EncodedImage],
}

/// The remote side of the oracle. Returns the model's raw text answer.
pub trait VisionTransport {
    fn complete(&self, request: &OracleRequest<'_>) -> Result<String, OracleError>;
}

impl<T: VisionTransport + ?Sized> VisionTransport for Box<T> {
    fn complete(&self, request: &OracleRequest<'_>) -> Result<String, OracleError> {
        (**self).complete(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub image_count: usize,
    pub prompt: String,
}

type Responder = Box<dyn Fn(&OracleRequest<'_>) -> Result<String, OracleError> + Send + Sync>;

/// 模拟传输 - answers from a queue or a closure and records every call.
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Result<String, String>>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    /// Replies are consumed in order; an exhausted queue is a transport error.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<S, S>>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(Into::into).map_err(Into::into))
                    .collect(),
            ),
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&OracleRequest<'_>) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(responder)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing(reason: &str) -> Self {
        let reason = reason.to_string();
        Self::from_fn(move |_| Err(OracleError::Transport(reason.clone())))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl VisionTransport for ScriptedTransport {
    fn complete(&self, request: &OracleRequest<'_>) -> Result<String, OracleError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                model: request.model.to_string(),
                image_count: request.images.len(),
                prompt: request.prompt.to_string(),
            });
        }

        if let Some(responder) = &self.responder {
            return responder(request);
        }

        let next = self
            .queue
            .lock()
            .map_err(|e| OracleError::Transport(format!("queue lock poisoned: {}", e)))?
            .pop_front();
        match next {
            Some(Ok(body)) => Ok(body),
            Some(Err(reason)) => Err(OracleError::Transport(reason)),
            None => Err(OracleError::Transport("no scripted reply left".to_string())),
        }
    }
}
