use lambda_json_logger::{get_logger, init_tracing, ExtraData, Logger};
use std::error::Error;
use std::fmt;
use tokio::time::{sleep, Duration};

#[derive(Debug)]
struct ValueError(String);

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for ValueError {}

#[derive(Debug)]
struct HandlerError(ValueError);

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler failed: {}", self.0)
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

fn validate(logger: &Logger) -> Result<(), ValueError> {
    logger.debug("validate.", None, None);
    Err(ValueError("Invalid values.".to_string()))
}

async fn handle(logger: Logger, request: u32) -> Result<(), HandlerError> {
    let extra = ExtraData::new().with("request", request).with("a", "abc").with("c", 123);
    logger.info("Start handler.", Some("I0001"), Some(&extra));
    sleep(Duration::from_millis(10)).await;
    validate(&logger).map_err(HandlerError)
}

#[tokio::main]
async fn main() {
    let logger = get_logger();
    let extra = ExtraData::new().with("a", "abc").with("b", "def").with("c", 123);

    logger.debug("Debug logging.", None, None);
    logger.info("Info logging.\n Info logging.", None, Some(&extra));
    logger.info("Info logging.\n Info logging.", Some("I0001"), Some(&extra));
    logger.warning("Warning logging.\n Warning logging", "W0001", None);
    logger.warning("Warning logging.\n Warning logging", "W0001", Some(&extra));
    logger.error("Error logging.\n Error logging.", "E0001", None, None);

    // Each invocation carries its own trace header.
    let headers = [
        "Root=1-64193bc5-14fda5f13f1ccef9177e2502;Parent=a9094f386f8990fc;Sampled=1",
        "Root=1-64193bc6-0c2c8a1f9d3e4b5a6c7d8e9f;Parent=b1c2d3e4f5a6b7c8;Sampled=0",
    ];
    let mut tasks = Vec::new();
    for (request, header) in headers.into_iter().enumerate() {
        let invocation = logger.for_invocation(Some(header));
        tasks.push(tokio::spawn(async move {
            if let Err(e) = handle(invocation.clone(), request as u32).await {
                invocation.error("Error logging.", "E0002", None, Some(&e));
                invocation.warning_with_trace("Warning logging.", "W0002", Some(&extra_for(request)), Some(&e));
            }
        }));
    }
    for task in tasks {
        if let Err(e) = task.await {
            logger.error("invocation task failed", "E0003", None, Some(&e));
        }
    }

    // The same lines through `tracing` macros.
    if let Err(e) = init_tracing(logger.clone()) {
        logger.error("could not install tracing subscriber", "E0004", None, Some(&e));
        return;
    }
    tracing::info!(code = "I0002", user_id = 42, "tracing bridge active");
    let err = ValueError("Invalid values.".to_string());
    tracing::error!(code = "E0005", error = &err as &(dyn Error + 'static), "tracing error");

    logger.flush();
}

fn extra_for(request: usize) -> ExtraData {
    ExtraData::new().with("request", request as u64)
}
