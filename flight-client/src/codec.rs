//! Wire-format definitions for requests and responses.
//!
//! Every request is one datagram: an opcode byte followed by six
//! length-prefixed text fields.  Every response is a status byte, an opcode
//! byte, and zero or more length-prefixed text messages.  This module:
//! - Models the six server operations as a closed [`Request`] sum type.
//! - Serialises requests into bytes ready for transmission.
//! - Deserialises response datagrams, rejecting truncated input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! ```text
//! request:  [opcode:1][len:1][id][len:1][source][len:1][destination]
//!           [len:1][departure_time][len:1][seats][len:1][duration]
//! response: [status:1][opcode:1] ([len:1][text])*
//! ```
//!
//! Numeric fields (`id`, `seats`, `duration`) travel as base-10 text, not as
//! binary integers.  A length byte bounds every field to [`MAX_FIELD_LEN`]
//! bytes and a whole datagram may not exceed [`MAX_DATAGRAM`] bytes.

use std::fmt;

use thiserror::Error;

/// Largest datagram either side will send or accept.
pub const MAX_DATAGRAM: usize = 1024;

/// Largest text field representable behind a one-byte length prefix.
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Server operation selected by the first byte of a request.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    QueryFlights = 1,
    FlightDetails = 2,
    Reserve = 3,
    Monitor = 4,
    QueryPoints = 5,
    ReserveWithPoints = 6,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Opcode::QueryFlights,
            2 => Opcode::FlightDetails,
            3 => Opcode::Reserve,
            4 => Opcode::Monitor,
            5 => Opcode::QueryPoints,
            6 => Opcode::ReserveWithPoints,
            _ => return None,
        })
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable operation name.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::QueryFlights => "query flights",
            Opcode::FlightDetails => "flight details",
            Opcode::Reserve => "reserve seats",
            Opcode::Monitor => "monitor seats",
            Opcode::QueryPoints => "query points",
            Opcode::ReserveWithPoints => "reserve seats with points",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.to_u8())
    }
}

/// Flat field set carried by every request regardless of opcode.
///
/// Fields that an opcode does not use are zero / empty on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPayload {
    pub id: u32,
    pub source: String,
    pub destination: String,
    pub departure_time: String,
    pub seats_to_book: u32,
    pub duration_secs: u32,
}

/// One request, carrying only the fields its operation reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    QueryFlights { source: String, destination: String },
    FlightDetails { id: u32 },
    Reserve { id: u32, seats: u32 },
    Monitor { id: u32, duration_secs: u32 },
    QueryPoints,
    ReserveWithPoints { id: u32, seats: u32 },
}

impl Request {
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::QueryFlights { .. } => Opcode::QueryFlights,
            Request::FlightDetails { .. } => Opcode::FlightDetails,
            Request::Reserve { .. } => Opcode::Reserve,
            Request::Monitor { .. } => Opcode::Monitor,
            Request::QueryPoints => Opcode::QueryPoints,
            Request::ReserveWithPoints { .. } => Opcode::ReserveWithPoints,
        }
    }

    /// Expand into the flat wire field set.
    pub fn payload(&self) -> RequestPayload {
        match self {
            Request::QueryFlights {
                source,
                destination,
            } => RequestPayload {
                source: source.clone(),
                destination: destination.clone(),
                ..Default::default()
            },
            Request::FlightDetails { id } => RequestPayload {
                id: *id,
                ..Default::default()
            },
            Request::Reserve { id, seats } | Request::ReserveWithPoints { id, seats } => {
                RequestPayload {
                    id: *id,
                    seats_to_book: *seats,
                    ..Default::default()
                }
            }
            Request::Monitor { id, duration_secs } => RequestPayload {
                id: *id,
                duration_secs: *duration_secs,
                ..Default::default()
            },
            Request::QueryPoints => RequestPayload::default(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode(self.opcode(), &self.payload())
    }
}

/// Result of decoding one response datagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMessage {
    pub status_code: u8,
    /// Echo of the request opcode; kept raw so unknown values still render.
    pub opcode: u8,
    pub messages: Vec<String>,
}

impl ResponseMessage {
    /// Serialise as a response datagram (the server side of the format).
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![self.status_code, self.opcode];
        for (i, message) in self.messages.iter().enumerate() {
            write_field(&mut out, Field::Message(i), message.as_bytes())?;
        }
        check_datagram_len(&out)?;
        Ok(out)
    }
}

impl fmt::Display for ResponseMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Status Code: {}, Opcode: {}",
            self.status_code, self.opcode
        )?;
        for message in &self.messages {
            write!(f, "\n{message}")?;
        }
        Ok(())
    }
}

/// Names the field an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Source,
    Destination,
    DepartureTime,
    SeatsToBook,
    Duration,
    Message(usize),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Id => write!(f, "id"),
            Field::Source => write!(f, "source"),
            Field::Destination => write!(f, "destination"),
            Field::DepartureTime => write!(f, "departure time"),
            Field::SeatsToBook => write!(f, "seats to book"),
            Field::Duration => write!(f, "duration"),
            Field::Message(i) => write!(f, "message #{i}"),
        }
    }
}

/// Errors that can arise when encoding or decoding a datagram.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("{field} is {len} bytes, the limit is 255")]
    FieldTooLong { field: Field, len: usize },
    #[error("datagram would be {len} bytes, the limit is 1024")]
    PayloadTooLarge { len: usize },
    #[error("datagram of {len} bytes is shorter than the response header")]
    HeaderTooShort { len: usize },
    #[error("field declares {declared} bytes but only {remaining} remain")]
    TruncatedMessage { declared: usize, remaining: usize },
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),
    #[error("{field} is not a decimal number: {text:?}")]
    InvalidNumber { field: Field, text: String },
}

/// Serialise one request.
///
/// Field lengths are checked before anything is written; an over-long field
/// is an error, never truncated.
pub fn encode(opcode: Opcode, payload: &RequestPayload) -> Result<Vec<u8>, CodecError> {
    let id = payload.id.to_string();
    let seats = payload.seats_to_book.to_string();
    let duration = payload.duration_secs.to_string();

    let fields: [(Field, &[u8]); 6] = [
        (Field::Id, id.as_bytes()),
        (Field::Source, payload.source.as_bytes()),
        (Field::Destination, payload.destination.as_bytes()),
        (Field::DepartureTime, payload.departure_time.as_bytes()),
        (Field::SeatsToBook, seats.as_bytes()),
        (Field::Duration, duration.as_bytes()),
    ];

    let len = 1 + fields.iter().map(|(_, b)| 1 + b.len()).sum::<usize>();
    let mut out = Vec::with_capacity(len);
    out.push(opcode.to_u8());
    for (field, bytes) in fields {
        write_field(&mut out, field, bytes)?;
    }
    check_datagram_len(&out)?;
    Ok(out)
}

/// Parse one response datagram.
///
/// Zero-length messages are skipped.  A length byte that claims more bytes
/// than remain yields [`CodecError::TruncatedMessage`].
pub fn decode(buf: &[u8]) -> Result<ResponseMessage, CodecError> {
    let [status_code, opcode, body @ ..] = buf else {
        return Err(CodecError::HeaderTooShort { len: buf.len() });
    };

    let mut reader = FieldReader::new(body);
    let mut messages = Vec::new();
    while !reader.is_empty() {
        let text = reader.read_field()?;
        if !text.is_empty() {
            messages.push(String::from_utf8_lossy(text).into_owned());
        }
    }

    Ok(ResponseMessage {
        status_code: *status_code,
        opcode: *opcode,
        messages,
    })
}

/// Parse one request datagram (the server side of the format).
pub fn decode_request(buf: &[u8]) -> Result<(Opcode, RequestPayload), CodecError> {
    let (&op, body) = buf
        .split_first()
        .ok_or(CodecError::HeaderTooShort { len: 0 })?;
    let opcode = Opcode::from_u8(op).ok_or(CodecError::UnknownOpcode(op))?;

    let mut reader = FieldReader::new(body);
    let id = reader.read_number(Field::Id)?;
    let source = reader.read_text()?;
    let destination = reader.read_text()?;
    let departure_time = reader.read_text()?;
    let seats_to_book = reader.read_number(Field::SeatsToBook)?;
    let duration_secs = reader.read_number(Field::Duration)?;

    Ok((
        opcode,
        RequestPayload {
            id,
            source,
            destination,
            departure_time,
            seats_to_book,
            duration_secs,
        },
    ))
}

fn write_field(out: &mut Vec<u8>, field: Field, bytes: &[u8]) -> Result<(), CodecError> {
    let len = u8::try_from(bytes.len()).map_err(|_| CodecError::FieldTooLong {
        field,
        len: bytes.len(),
    })?;
    out.push(len);
    out.extend_from_slice(bytes);
    Ok(())
}

fn check_datagram_len(out: &[u8]) -> Result<(), CodecError> {
    if out.len() > MAX_DATAGRAM {
        return Err(CodecError::PayloadTooLarge { len: out.len() });
    }
    Ok(())
}

/// Cursor over a sequence of length-prefixed fields.
struct FieldReader<'a> {
    rest: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(rest: &'a [u8]) -> Self {
        Self { rest }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn read_field(&mut self) -> Result<&'a [u8], CodecError> {
        let (&len, tail) = self
            .rest
            .split_first()
            .ok_or(CodecError::TruncatedMessage {
                declared: 1,
                remaining: 0,
            })?;
        let len = usize::from(len);
        if len > tail.len() {
            return Err(CodecError::TruncatedMessage {
                declared: len,
                remaining: tail.len(),
            });
        }
        let (field, tail) = tail.split_at(len);
        self.rest = tail;
        Ok(field)
    }

    fn read_text(&mut self) -> Result<String, CodecError> {
        Ok(String::from_utf8_lossy(self.read_field()?).into_owned())
    }

    fn read_number(&mut self, field: Field) -> Result<u32, CodecError> {
        let text = self.read_text()?;
        text.parse()
            .map_err(|_| CodecError::InvalidNumber { field, text })
    }
}
