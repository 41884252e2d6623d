use std::fmt;

pub type SendableError = Box<dyn std::error::Error + Send + Sync>;

/// Process-level failure carrying a dotted code such as `startup.logger`.
#[derive(Debug)]
pub struct RuntimeError {
    code: String,
    message: String,
}

impl RuntimeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn boxed(code: impl Into<String>, message: impl fmt::Display) -> SendableError {
        Box::new(Self::new(code, message.to_string()))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RuntimeError {}
