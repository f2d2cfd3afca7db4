use super::keyboard_input::KeyboardInputHandler;
use super::{Command, FacewatchApp, ShutdownReason};
use crate::error::Result;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};

impl FacewatchApp {
    /// Run until a signal or the operator asks to quit
    pub async fn run(&mut self) -> Result<i32> {
        info!("Facewatch is running");

        let (command_tx, command_rx) = mpsc::unbounded_channel();

        self.renderer.start();

        if self.keyboard_enabled {
            let handler = KeyboardInputHandler::new(command_tx.clone());
            handler.start().await?;
            self.keyboard_handler = Some(handler);
        }

        if self.autostart {
            self.handle_command(Command::Start);
        }

        let reason = self.process_commands(command_rx).await;
        drop(command_tx);

        info!("Shutdown initiated: {:?}", reason);
        self.shutdown().await
    }

    /// Apply commands until quit or a shutdown signal arrives
    pub async fn process_commands(
        &self,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) -> ShutdownReason {
        loop {
            tokio::select! {
                reason = shutdown_signal() => return reason,
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            return ShutdownReason::UserRequest;
                        }
                    }
                    None => {
                        // No more command producers; only signals can end the run
                        return shutdown_signal().await;
                    }
                },
            }
        }
    }

    /// Stop the loop and background tasks
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");
        let mut exit_code = 0;

        self.controller.stop();

        if let Some(handler) = self.keyboard_handler.take() {
            if let Err(e) = handler.stop().await {
                error!("Error stopping keyboard: {}", e);
                exit_code = 1;
            }
        }

        self.cancellation_token.cancel();

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}

/// Wait for SIGINT or (on Unix) SIGTERM
async fn shutdown_signal() -> ShutdownReason {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                return ctrl_c().await;
            }
        };

        tokio::select! {
            reason = ctrl_c() => reason,
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
                ShutdownReason::Signal("SIGTERM".to_string())
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> ShutdownReason {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT signal (Ctrl+C)"),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
    ShutdownReason::Signal("SIGINT".to_string())
}
