use lls_protocol::{Command, DeviceInfo};

/// Phase of the polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// No tick has fired since the connection opened.
    AwaitingFirstPoll,
    /// The device info has been requested; every tick reads a live reading.
    SteadyPolling,
}

/// Per-connection protocol state, carried across polling ticks.
#[derive(Debug, Clone)]
pub struct Session {
    address: u8,
    state: PollState,
    device_info: Option<DeviceInfo>,
}

impl Session {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            state: PollState::AwaitingFirstPoll,
            device_info: None,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// The last device information block received on this connection.
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    pub fn store_device_info(&mut self, info: DeviceInfo) {
        self.device_info = Some(info);
    }

    /// Command for the current tick. The first call after a (re)connect asks
    /// for the device info, every later call for a live reading.
    pub fn next_poll(&mut self) -> Command {
        match self.state {
            PollState::AwaitingFirstPoll => {
                self.state = PollState::SteadyPolling;
                Command::ReadDeviceInfo
            }
            PollState::SteadyPolling => Command::ReadReading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_reads_device_info() {
        let mut session = Session::new(3);
        assert_eq!(session.state(), PollState::AwaitingFirstPoll);
        assert_eq!(session.next_poll(), Command::ReadDeviceInfo);
        assert_eq!(session.state(), PollState::SteadyPolling);
        for _ in 0..100 {
            assert_eq!(session.next_poll(), Command::ReadReading);
        }
    }

    #[test]
    fn test_new_session_starts_over() {
        let mut first = Session::new(3);
        first.next_poll();
        assert_eq!(first.next_poll(), Command::ReadReading);

        let mut second = Session::new(3);
        assert_eq!(second.device_info(), None);
        assert_eq!(second.next_poll(), Command::ReadDeviceInfo);
    }
}
