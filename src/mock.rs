//! Recording fakes for the bus and the output ports, test builds only.

use crate::port::{DigitalOutput, Level};
use embedded_hal::spi::{Error, ErrorKind, ErrorType, Operation, SpiDevice};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug)]
pub struct MockSpiError;

impl Error for MockSpiError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Clone, Default)]
pub struct WriteLog(Rc<RefCell<Vec<Vec<u8>>>>);

impl WriteLog {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0.borrow().clone()
    }
}

/// SpiDevice that records every write, optionally failing on the nth one.
pub struct MockSpi {
    log: WriteLog,
    fail_on: Option<usize>,
}

impl MockSpi {
    pub fn new() -> MockSpi {
        MockSpi {
            log: WriteLog::default(),
            fail_on: None,
        }
    }

    pub fn failing_on(nth: usize) -> MockSpi {
        MockSpi {
            log: WriteLog::default(),
            fail_on: Some(nth),
        }
    }

    pub fn log(&self) -> WriteLog {
        self.log.clone()
    }
}

impl ErrorType for MockSpi {
    type Error = MockSpiError;
}

impl SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), MockSpiError> {
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if self.fail_on == Some(self.log.0.borrow().len()) {
                        return Err(MockSpiError);
                    }
                    self.log.0.borrow_mut().push(bytes.to_vec());
                }
                _ => panic!("mock bus only supports writes"),
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct LevelLog(Rc<RefCell<Vec<Level>>>);

impl LevelLog {
    pub fn levels(&self) -> Vec<Level> {
        self.0.borrow().clone()
    }
}

/// Output port that records the levels driven onto it.
#[derive(Default)]
pub struct MockPort {
    log: LevelLog,
}

impl MockPort {
    pub fn new() -> MockPort {
        MockPort::default()
    }

    pub fn log(&self) -> LevelLog {
        self.log.clone()
    }
}

impl DigitalOutput for MockPort {
    fn set(&mut self, level: Level) {
        self.log.0.borrow_mut().push(level);
    }
}
