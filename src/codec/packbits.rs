use super::DecodeError;

enum State {
    Scan,
    Literal(usize),
    Repeat { byte: u8, remaining: usize },
}

/// Lazily expands a PackBits run-length stream, one byte at a time.
///
/// Each control byte is a signed value: -128 is a no-op, 0..=127 announces a
/// literal run of control+1 following bytes, -127..=-1 announces 1-control
/// repetitions of the single following byte. The sequence ends when the input
/// ends at a run boundary; ending inside a run is an error, after which the
/// iterator is fused.
pub struct UnpackBits<I: Iterator<Item = u8>> {
    input: I,
    state: State,
    failed: bool,
}

impl<I: Iterator<Item = u8>> UnpackBits<I> {
    pub fn new(input: I) -> Self {
        Self {
            input,
            state: State::Scan,
            failed: false,
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for UnpackBits<I> {
    type Item = Result<u8, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.state {
                State::Literal(0) | State::Repeat { remaining: 0, .. } => {
                    self.state = State::Scan;
                }
                State::Literal(ref mut remaining) => {
                    let expected = *remaining;
                    *remaining -= 1;
                    return match self.input.next() {
                        Some(byte) => Some(Ok(byte)),
                        None => {
                            self.failed = true;
                            Some(Err(DecodeError::TruncatedLiteralRun { expected }))
                        }
                    };
                }
                State::Repeat {
                    byte,
                    ref mut remaining,
                } => {
                    *remaining -= 1;
                    return Some(Ok(byte));
                }
                State::Scan => {
                    let control = self.input.next()? as i8;
                    match control {
                        -128 => {} // no-op
                        0..=127 => self.state = State::Literal(control as usize + 1),
                        _ => {
                            let count = (1 - control as i32) as usize;
                            match self.input.next() {
                                Some(byte) => {
                                    self.state = State::Repeat {
                                        byte,
                                        remaining: count,
                                    }
                                }
                                None => {
                                    self.failed = true;
                                    return Some(Err(DecodeError::TruncatedRepeatRun { count }));
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Expands a complete PackBits buffer.
pub fn unpack_bits(packed: &[u8]) -> Result<Vec<u8>, DecodeError> {
    UnpackBits::new(packed.iter().copied()).collect()
}
