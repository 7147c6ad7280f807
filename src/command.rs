use std::fmt;

use enum_primitive::FromPrimitive;


enum_from_primitive! {
/// Commands understood by the motor controller board. Each one is sent as a single ASCII byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Forward = b'F',
    Stop = b'S',
    TurnLeft = b'L',
    TurnRight = b'R',
    Center = b'C',
}
}


impl Command {
    pub fn symbol(self) -> u8 {
        self as u8
    }

    pub fn from_symbol(symbol: u8) -> Option<Command> {
        Command::from_u8(symbol)
    }
}


impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol() as char)
    }
}


/**
 * The commands produced by one navigation cycle, in the order they must reach the board. A
 * steering command is always followed by the throttle command, so the pair is sent (and resent
 * after a failure) together.
 */
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<Command>,
}


impl CommandBatch {
    pub fn empty() -> CommandBatch {
        CommandBatch {
            commands: Vec::new(),
        }
    }

    pub fn stop() -> CommandBatch {
        CommandBatch {
            commands: vec![Command::Stop],
        }
    }

    /// Steering, then throttle so that propulsion is asserted every cycle.
    pub fn steer(steering: Command) -> CommandBatch {
        CommandBatch {
            commands: vec![steering, Command::Forward],
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// True if the motors are stopped once this batch has been delivered.
    pub fn ends_stopped(&self) -> bool {
        self.commands.last() == Some(&Command::Stop)
    }

    pub fn symbols(&self) -> Vec<u8> {
        self.commands.iter().map(|command| command.symbol()).collect()
    }
}


impl fmt::Display for CommandBatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.commands.is_empty() {
            return write!(f, "-");
        }
        for command in &self.commands {
            write!(f, "{}", command)?;
        }
        Ok(())
    }
}
