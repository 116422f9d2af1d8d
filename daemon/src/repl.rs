/// Interactive console running beside the server.
///
/// Line in, evaluation, line out, over the same evaluator the network
/// connections use, so definitions made from the console are visible to
/// SLIME and vice versa.
use std::sync::Arc;
use swank_core::Evaluator;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

pub async fn run(evaluator: Arc<dyn Evaluator>) -> std::io::Result<()> {
    let prompt = evaluator.implementation().prompt;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout.write_all(b"REPL started\n").await?;
    loop {
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => {
                debug!("console closed");
                return Ok(());
            }
        };
        let source = line.trim();
        if source.is_empty() {
            continue;
        }

        match evaluator.eval(source) {
            Ok(text) => stdout.write_all(format!("{text}\n").as_bytes()).await?,
            Err(err) => stdout.write_all(format!("error: {err}\n").as_bytes()).await?,
        }
    }
}
