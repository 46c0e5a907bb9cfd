//! JSON-lines bridge between a presentation layer and the controller
//!
//! Each input line is one [`InboundMessage`]; each output line is one
//! [`OutboundMessage`]. Malformed input lines are logged and skipped. When
//! the input ends the controller is shut down and remaining output is
//! flushed before returning.

use anyhow::{Context, Result};
use tabmux_core::{ControllerHandle, InboundMessage, OutboundMessage};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Pump messages until the controller's outbound stream closes.
pub async fn run<R, W>(
    input: R,
    mut output: W,
    handle: ControllerHandle,
    mut outbound: mpsc::UnboundedReceiver<OutboundMessage>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read input")? {
                    Some(line) => forward_line(&handle, &line),
                    None => {
                        debug!("Input closed, stopping controller");
                        input_open = false;
                        let _ = handle.shutdown();
                    }
                }
            }
            message = outbound.recv() => match message {
                Some(message) => write_message(&mut output, &message).await?,
                None => break,
            },
        }
    }

    output.flush().await.context("Failed to flush output")?;
    Ok(())
}

fn forward_line(handle: &ControllerHandle, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<InboundMessage>(line) {
        Ok(message) => {
            if let Err(e) = handle.send(message) {
                warn!(error = %e, "Dropping message");
            }
        }
        Err(e) => warn!(error = %e, line = %line, "Ignoring malformed message"),
    }
}

async fn write_message<W: AsyncWrite + Unpin>(output: &mut W, message: &OutboundMessage) -> Result<()> {
    let mut line = serde_json::to_vec(message).context("Failed to encode message")?;
    line.push(b'\n');
    output.write_all(&line).await.context("Failed to write output")?;
    output.flush().await.context("Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tabmux_core::{Controller, CoreConfig, FirstRootPicker, PtyBackend};
    use tabmux_pty::TerminalConfig;

    fn controller_with(
        program: &str,
        args: &[&str],
    ) -> (
        Controller,
        ControllerHandle,
        mpsc::UnboundedReceiver<OutboundMessage>,
    ) {
        let mut config = CoreConfig::default();
        config.terminal.launch =
            TerminalConfig::direct(program, args.iter().map(|a| a.to_string()).collect());
        Controller::new(config, Arc::new(PtyBackend), Arc::new(FirstRootPicker))
    }

    #[tokio::test]
    async fn test_input_eof_shuts_down_and_flushes() {
        let (controller, handle, outbound) = controller_with("sh", &["-c", "sleep 5"]);
        let task = tokio::spawn(controller.run());

        let input: &[u8] = b"{\"type\":\"ready\",\"cols\":80,\"rows\":24}\nnot json\n\n";
        let mut output = Vec::new();
        tokio::time::timeout(
            Duration::from_secs(10),
            run(input, &mut output, handle, outbound),
        )
        .await
        .unwrap()
        .unwrap();
        task.await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let messages: Vec<OutboundMessage> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert!(matches!(
            messages.first(),
            Some(OutboundMessage::SessionCreated { .. })
        ));
        assert!(messages
            .iter()
            .any(|m| matches!(m, OutboundMessage::SessionsUpdate { .. })));
    }

    #[tokio::test]
    async fn test_outbound_closing_ends_bridge() {
        let (controller, handle, outbound) = controller_with("sh", &["-c", "sleep 5"]);
        handle.shutdown().unwrap();
        controller.run().await;

        let (_keep_open, reader) = tokio::io::duplex(64);
        let mut output = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), run(reader, &mut output, handle, outbound))
            .await
            .unwrap()
            .unwrap();
        assert!(output.is_empty());
    }
}
