use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to spawn consumer thread {consumer}")]
    Spawn {
        consumer: usize,
        #[source]
        source: io::Error,
    },
}
