use tracing::{debug, info};

use crate::engine::SshTransport;
use crate::error::Result;
use crate::session::Session;
use crate::types::CommandOutput;

/// Runs `command` on a fresh exec channel and returns everything it printed.
pub async fn execute_output<T: SshTransport>(
    session: &mut Session<T>,
    command: &str,
) -> Result<CommandOutput> {
    info!("Executing {:?}", command);
    let output = session.transport_mut()?.exec(command).await?;
    debug!(
        "Command finished: {} stdout bytes, {} stderr bytes, exit status {:?}",
        output.stdout.len(),
        output.stderr.len(),
        output.exit_status
    );
    Ok(output)
}

/// Runs `command` and returns its stdout lines, or its stderr lines when
/// stdout is empty. The exit status is not consulted.
pub async fn execute<T: SshTransport>(session: &mut Session<T>, command: &str) -> Result<Vec<String>> {
    Ok(execute_output(session, command).await?.lines())
}
