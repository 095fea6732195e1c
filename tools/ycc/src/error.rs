/// Top-level diagnostics, already rendered as `line R:C: <source line>`
/// followed by the underlying error's message (see `ychir::diagnostic`),
/// since by the time this error reaches `main` the source text that
/// produced it is no longer in scope.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Source(String),
    #[error("{0}")]
    Interpreter(String),
}
