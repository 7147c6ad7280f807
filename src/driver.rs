use std::io::Write;

use crate::command::{Command, CommandBatch};
use crate::link::{LinkError, LinkKind};


/// Provides an interface to drive the boat.
pub trait Driver {
    /**
     * Sends a batch of commands. An empty batch sends nothing. A failed batch is held and resent
     * by retry_pending until a newer batch replaces it.
     */
    fn drive(&mut self, batch: &CommandBatch) -> Result<(), LinkError>;

    /**
     * Resends the last failed batch, if any. Returns true if something was resent successfully.
     */
    fn retry_pending(&mut self) -> Result<bool, LinkError>;

    fn has_pending(&self) -> bool;

    /// Sends a final stop. Nothing is retried after this.
    fn halt(&mut self) -> Result<(), LinkError>;
}


/**
 * Writes single byte commands to the motor controller board. The board doesn't reply, so a write
 * that goes through is all the confirmation there is.
 */
pub struct SerialDriver<W: Write> {
    link: W,
    pending: Option<CommandBatch>,
    /// The last batch that went out left the motors stopped.
    stopped: bool,
}


impl<W: Write> SerialDriver<W> {
    pub fn new(link: W) -> SerialDriver<W> {
        SerialDriver {
            link,
            pending: None,
            stopped: false,
        }
    }

    pub fn link(&self) -> &W {
        &self.link
    }

    fn write(&mut self, batch: &CommandBatch) -> Result<(), LinkError> {
        // One write per command, in order, so the board sees exactly what the controller decided
        for command in batch.commands() {
            if let Err(source) = self.link.write_all(&[command.symbol()]) {
                return Err(io_error(source));
            }
        }
        self.link.flush().map_err(io_error)
    }
}


impl<W: Write> Driver for SerialDriver<W> {
    fn drive(&mut self, batch: &CommandBatch) -> Result<(), LinkError> {
        if batch.is_empty() {
            return Ok(());
        }
        match self.write(batch) {
            Ok(_) => {
                self.pending = None;
                self.stopped = batch.ends_stopped();
                Ok(())
            }
            Err(e) => {
                // Part of the batch may have gone out
                self.stopped = false;
                self.pending = Some(batch.clone());
                Err(e)
            }
        }
    }

    fn retry_pending(&mut self) -> Result<bool, LinkError> {
        let batch = match self.pending.take() {
            Some(batch) => batch,
            None => return Ok(false),
        };
        debug!("Resending {}", batch);
        match self.write(&batch) {
            Ok(_) => {
                self.stopped = batch.ends_stopped();
                Ok(true)
            }
            Err(e) => {
                self.stopped = false;
                self.pending = Some(batch);
                Err(e)
            }
        }
    }

    fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn halt(&mut self) -> Result<(), LinkError> {
        self.pending = None;
        // Nothing is retried after a halt, so don't try again on drop either
        self.stopped = true;
        self.write(&CommandBatch::stop())
    }
}


impl<W: Write> Drop for SerialDriver<W> {
    fn drop(&mut self) {
        // Whatever happened, don't leave the motor running
        if !self.stopped {
            match self.halt() {
                Ok(_) => info!("Sent {} while releasing the actuator link", Command::Stop),
                Err(e) => error!("Unable to stop motors while releasing the link: {}", e),
            }
        }
    }
}


fn io_error(source: std::io::Error) -> LinkError {
    LinkError::Io {
        link: LinkKind::Actuator,
        source,
    }
}
