//! Terminal stakeholder selection.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use outreach_core::task::Stakeholder;
use outreach_engine::{parse_selection, EngineError, StakeholderSelector};

const MAX_ATTEMPTS: usize = 3;

/// Lists the roster and asks for a selection such as `1,3` or `all`.
/// Invalid input is re-prompted a few times before giving up.
pub struct PromptSelector<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> PromptSelector<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }
}

impl PromptSelector<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::BufReader::new(tokio::io::stdin()), tokio::io::stderr())
    }
}

fn io_error(e: std::io::Error) -> EngineError {
    EngineError::Selection(format!("terminal error: {e}"))
}

#[async_trait]
impl<R, W> StakeholderSelector for PromptSelector<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn select(&self, stakeholders: &[Stakeholder]) -> Result<Vec<usize>, EngineError> {
        let mut guard = self.io.lock().await;
        let (reader, writer) = &mut *guard;

        let mut listing = format!("\nFound {} stakeholders:\n", stakeholders.len());
        for (i, s) in stakeholders.iter().enumerate() {
            listing.push_str(&format!("  {}. {}\n", i + 1, s));
        }
        writer.write_all(listing.as_bytes()).await.map_err(io_error)?;

        let mut last_error = EngineError::Selection("no selection entered".into());
        for _ in 0..MAX_ATTEMPTS {
            writer
                .write_all(b"Select stakeholders (e.g. 1,3 or all): ")
                .await
                .map_err(io_error)?;
            writer.flush().await.map_err(io_error)?;

            let mut line = String::new();
            if reader.read_line(&mut line).await.map_err(io_error)? == 0 {
                break;
            }
            match parse_selection(&line, stakeholders.len()) {
                Ok(indices) => return Ok(indices),
                Err(e) => {
                    writer.write_all(format!("{e}\n").as_bytes()).await.map_err(io_error)?;
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Stakeholder> {
        vec![
            Stakeholder::new("Dr. Jane Smith", "CTO", ""),
            Stakeholder::new("Michael Chen", "VP of Product", ""),
            Stakeholder::new("Ana Ruiz", "CMO", ""),
        ]
    }

    #[tokio::test]
    async fn lists_and_parses_selection() {
        let selector = PromptSelector::new(&b"1,3\n"[..], Vec::new());
        assert_eq!(selector.select(&roster()).await.unwrap(), vec![0, 2]);

        let (_, written) = selector.io.into_inner();
        let text = String::from_utf8(written).unwrap();
        assert!(text.contains("1. Dr. Jane Smith (CTO)"));
        assert!(text.contains("3. Ana Ruiz (CMO)"));
    }

    #[tokio::test]
    async fn reprompts_after_bad_input() {
        let selector = PromptSelector::new(&b"9\nall\n"[..], Vec::new());
        assert_eq!(selector.select(&roster()).await.unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn eof_is_selection_error() {
        let selector = PromptSelector::new(&b""[..], Vec::new());
        assert!(matches!(
            selector.select(&roster()).await,
            Err(EngineError::Selection(_))
        ));
    }
}
