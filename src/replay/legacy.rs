//! Legacy trailing payload.
//!
//! Older replay files end with a third block written by the game client's
//! object serializer (pickle). Only the plain-data subset is understood:
//! dicts, lists, tuples, sets, ints, longs, floats, strings, bytes, bools,
//! None and the memo. Anything that references a class makes the whole
//! payload unreadable, which the decoder treats as an absent payload.
//!
//! The result is a JSON tree; dict keys are stringified so integer account
//! ids come out as `"12345"`, the same as in the JSON sections.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::extraction::lenient::map_key;

/// Deepest container nesting accepted.
pub const MAX_LEGACY_DEPTH: usize = 256;

/// Largest tree a payload may expand to, counted as one unit per node plus
/// one per string byte. Shared references are counted at every use.
pub const MAX_LEGACY_NODES: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegacyPayloadError {
    #[error("payload ended unexpectedly at offset {0}")]
    UnexpectedEnd(usize),

    #[error("unsupported opcode 0x{opcode:02x} at offset {offset}")]
    UnsupportedOpcode { opcode: u8, offset: usize },

    #[error("stack underflow at offset {0}")]
    StackUnderflow(usize),

    #[error("no mark to pop at offset {0}")]
    MissingMark(usize),

    #[error("memo entry {0} not found")]
    MissingMemo(u32),

    #[error("invalid {what} at offset {offset}")]
    Invalid { what: &'static str, offset: usize },

    #[error("nesting too deep")]
    TooDeep,

    #[error("payload expands past the size limit")]
    TooLarge,
}

type Result<T> = std::result::Result<T, LegacyPayloadError>;

mod op {
    pub const MARK: u8 = b'(';
    pub const STOP: u8 = b'.';
    pub const POP: u8 = b'0';
    pub const POP_MARK: u8 = b'1';
    pub const DUP: u8 = b'2';
    pub const FLOAT: u8 = b'F';
    pub const INT: u8 = b'I';
    pub const BININT: u8 = b'J';
    pub const BININT1: u8 = b'K';
    pub const LONG: u8 = b'L';
    pub const BININT2: u8 = b'M';
    pub const NONE: u8 = b'N';
    pub const STRING: u8 = b'S';
    pub const BINSTRING: u8 = b'T';
    pub const SHORT_BINSTRING: u8 = b'U';
    pub const UNICODE: u8 = b'V';
    pub const BINUNICODE: u8 = b'X';
    pub const APPEND: u8 = b'a';
    pub const DICT: u8 = b'd';
    pub const EMPTY_DICT: u8 = b'}';
    pub const APPENDS: u8 = b'e';
    pub const GET: u8 = b'g';
    pub const BINGET: u8 = b'h';
    pub const LONG_BINGET: u8 = b'j';
    pub const LIST: u8 = b'l';
    pub const EMPTY_LIST: u8 = b']';
    pub const PUT: u8 = b'p';
    pub const BINPUT: u8 = b'q';
    pub const LONG_BINPUT: u8 = b'r';
    pub const SETITEM: u8 = b's';
    pub const TUPLE: u8 = b't';
    pub const EMPTY_TUPLE: u8 = b')';
    pub const SETITEMS: u8 = b'u';
    pub const BINFLOAT: u8 = b'G';
    pub const BINBYTES: u8 = b'B';
    pub const SHORT_BINBYTES: u8 = b'C';
    pub const PROTO: u8 = 0x80;
    pub const TUPLE1: u8 = 0x85;
    pub const TUPLE2: u8 = 0x86;
    pub const TUPLE3: u8 = 0x87;
    pub const NEWTRUE: u8 = 0x88;
    pub const NEWFALSE: u8 = 0x89;
    pub const LONG1: u8 = 0x8a;
    pub const LONG4: u8 = 0x8b;
    pub const SHORT_BINUNICODE: u8 = 0x8c;
    pub const BINUNICODE8: u8 = 0x8d;
    pub const BINBYTES8: u8 = 0x8e;
    pub const EMPTY_SET: u8 = 0x8f;
    pub const ADDITEMS: u8 = 0x90;
    pub const FROZENSET: u8 = 0x91;
    pub const MEMOIZE: u8 = 0x94;
    pub const FRAME: u8 = 0x95;
}

/// Deserialize a legacy payload into a JSON tree.
pub fn unpickle(data: &[u8]) -> Result<Value> {
    Machine::new(data).run()
}

/// Stack entry. Memoized or duplicated items move to the shared arena and
/// are referenced by index, so later mutations are seen by every reference
/// and copies stay constant size.
#[derive(Debug, Clone)]
enum Item {
    Json(Value),
    List(Vec<Item>),
    Dict(Vec<(Item, Item)>),
    Ref(usize),
}

struct Machine<'a> {
    data: &'a [u8],
    pos: usize,
    stack: Vec<Item>,
    marks: Vec<usize>,
    /// Memo id -> arena index.
    memo: HashMap<u32, usize>,
    shared: Vec<Item>,
}

impl<'a> Machine<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            stack: Vec::new(),
            marks: Vec::new(),
            memo: HashMap::new(),
            shared: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Value> {
        loop {
            let offset = self.pos;
            let opcode = self.read_u8()?;

            match opcode {
                op::PROTO => {
                    self.read_u8()?;
                }
                op::FRAME => {
                    self.take(8)?;
                }
                op::STOP => {
                    let item = self.pop(offset)?;
                    let mut budget = MAX_LEGACY_NODES;
                    return self.resolve(&item, 0, &mut budget);
                }

                op::MARK => self.marks.push(self.stack.len()),
                op::POP => {
                    self.pop(offset)?;
                }
                op::POP_MARK => {
                    self.pop_marked(offset)?;
                }
                op::DUP => {
                    let item = self.pop(offset)?;
                    let index = self.share(item);
                    self.stack.push(Item::Ref(index));
                    self.stack.push(Item::Ref(index));
                }

                op::NONE => self.push_json(Value::Null),
                op::NEWTRUE => self.push_json(Value::Bool(true)),
                op::NEWFALSE => self.push_json(Value::Bool(false)),

                op::INT => {
                    let line = self.read_text_line(offset)?;
                    let value = match line.as_str() {
                        "00" => Value::Bool(false),
                        "01" => Value::Bool(true),
                        text => Value::from(parse_int(text, offset)?),
                    };
                    self.push_json(value);
                }
                op::LONG => {
                    let line = self.read_text_line(offset)?;
                    let value = parse_int(line.trim_end_matches('L'), offset)?;
                    self.push_json(Value::from(value));
                }
                op::BININT => {
                    let bytes = self.take_array::<4>()?;
                    self.push_json(Value::from(i32::from_le_bytes(bytes)));
                }
                op::BININT1 => {
                    let value = self.read_u8()?;
                    self.push_json(Value::from(value));
                }
                op::BININT2 => {
                    let bytes = self.take_array::<2>()?;
                    self.push_json(Value::from(u16::from_le_bytes(bytes)));
                }
                op::LONG1 => {
                    let len = self.read_u8()? as usize;
                    let bytes = self.take(len)?;
                    self.push_json(decode_long(bytes, offset)?);
                }
                op::LONG4 => {
                    let len = self.read_len_u32(offset)?;
                    let bytes = self.take(len)?;
                    self.push_json(decode_long(bytes, offset)?);
                }
                op::FLOAT => {
                    let line = self.read_text_line(offset)?;
                    let value: f64 = line.parse().map_err(|_| LegacyPayloadError::Invalid {
                        what: "float",
                        offset,
                    })?;
                    self.push_json(float_value(value));
                }
                op::BINFLOAT => {
                    let bytes = self.take_array::<8>()?;
                    self.push_json(float_value(f64::from_be_bytes(bytes)));
                }

                op::STRING => {
                    let line = self.read_text_line(offset)?;
                    self.push_json(Value::String(unquote(&line).to_string()));
                }
                op::UNICODE => {
                    let line = self.read_text_line(offset)?;
                    self.push_json(Value::String(line));
                }
                op::BINSTRING | op::BINUNICODE | op::BINBYTES => {
                    let len = self.read_len_u32(offset)?;
                    self.push_text(len)?;
                }
                op::SHORT_BINSTRING | op::SHORT_BINUNICODE | op::SHORT_BINBYTES => {
                    let len = self.read_u8()? as usize;
                    self.push_text(len)?;
                }
                op::BINUNICODE8 | op::BINBYTES8 => {
                    let bytes = self.take_array::<8>()?;
                    let len = usize::try_from(u64::from_le_bytes(bytes))
                        .map_err(|_| LegacyPayloadError::UnexpectedEnd(offset))?;
                    self.push_text(len)?;
                }

                op::EMPTY_DICT => self.stack.push(Item::Dict(Vec::new())),
                op::EMPTY_LIST | op::EMPTY_TUPLE | op::EMPTY_SET => {
                    self.stack.push(Item::List(Vec::new()))
                }
                op::DICT => {
                    let items = self.pop_marked(offset)?;
                    let pairs = into_pairs(items, offset)?;
                    self.stack.push(Item::Dict(pairs));
                }
                op::LIST | op::TUPLE | op::FROZENSET => {
                    let items = self.pop_marked(offset)?;
                    self.stack.push(Item::List(items));
                }
                op::TUPLE1 | op::TUPLE2 | op::TUPLE3 => {
                    let count = (opcode - op::TUPLE1 + 1) as usize;
                    if self.stack.len() < count {
                        return Err(LegacyPayloadError::StackUnderflow(offset));
                    }
                    let items = self.stack.split_off(self.stack.len() - count);
                    self.stack.push(Item::List(items));
                }

                op::APPEND => {
                    let value = self.pop(offset)?;
                    self.extend_list(vec![value], offset)?;
                }
                op::APPENDS | op::ADDITEMS => {
                    let items = self.pop_marked(offset)?;
                    self.extend_list(items, offset)?;
                }
                op::SETITEM => {
                    let value = self.pop(offset)?;
                    let key = self.pop(offset)?;
                    self.extend_dict(vec![(key, value)], offset)?;
                }
                op::SETITEMS => {
                    let items = self.pop_marked(offset)?;
                    let pairs = into_pairs(items, offset)?;
                    self.extend_dict(pairs, offset)?;
                }

                op::PUT => {
                    let line = self.read_text_line(offset)?;
                    let id = parse_memo_id(&line, offset)?;
                    self.memoize(id, offset)?;
                }
                op::BINPUT => {
                    let id = self.read_u8()? as u32;
                    self.memoize(id, offset)?;
                }
                op::LONG_BINPUT => {
                    let id = u32::from_le_bytes(self.take_array::<4>()?);
                    self.memoize(id, offset)?;
                }
                op::MEMOIZE => {
                    let id = self.memo.len() as u32;
                    self.memoize(id, offset)?;
                }
                op::GET => {
                    let line = self.read_text_line(offset)?;
                    let id = parse_memo_id(&line, offset)?;
                    self.push_ref(id)?;
                }
                op::BINGET => {
                    let id = self.read_u8()? as u32;
                    self.push_ref(id)?;
                }
                op::LONG_BINGET => {
                    let id = u32::from_le_bytes(self.take_array::<4>()?);
                    self.push_ref(id)?;
                }

                _ => return Err(LegacyPayloadError::UnsupportedOpcode { opcode, offset }),
            }
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(LegacyPayloadError::UnexpectedEnd(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let data: &'a [u8] = self.data;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= data.len())
            .ok_or(LegacyPayloadError::UnexpectedEnd(self.pos))?;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let offset = self.pos;
        self.take(N)?
            .try_into()
            .map_err(|_| LegacyPayloadError::UnexpectedEnd(offset))
    }

    fn read_len_u32(&mut self, offset: usize) -> Result<usize> {
        let len = i32::from_le_bytes(self.take_array::<4>()?);
        usize::try_from(len).map_err(|_| LegacyPayloadError::Invalid {
            what: "length",
            offset,
        })
    }

    /// Text argument of a protocol-0 opcode, up to (not including) the newline.
    fn read_text_line(&mut self, offset: usize) -> Result<String> {
        let rest = &self.data[self.pos..];
        let newline = rest
            .iter()
            .position(|b| *b == b'\n')
            .ok_or(LegacyPayloadError::UnexpectedEnd(offset))?;
        let line = self.take(newline)?;
        self.pos += 1;
        Ok(String::from_utf8_lossy(line).into_owned())
    }

    fn push_json(&mut self, value: Value) {
        self.stack.push(Item::Json(value));
    }

    fn push_text(&mut self, len: usize) -> Result<()> {
        let bytes = self.take(len)?;
        self.push_json(Value::String(String::from_utf8_lossy(bytes).into_owned()));
        Ok(())
    }

    fn push_ref(&mut self, id: u32) -> Result<()> {
        let index = *self
            .memo
            .get(&id)
            .ok_or(LegacyPayloadError::MissingMemo(id))?;
        self.stack.push(Item::Ref(index));
        Ok(())
    }

    fn pop(&mut self, offset: usize) -> Result<Item> {
        self.stack
            .pop()
            .ok_or(LegacyPayloadError::StackUnderflow(offset))
    }

    /// Pop everything above the most recent mark.
    fn pop_marked(&mut self, offset: usize) -> Result<Vec<Item>> {
        let mark = self
            .marks
            .pop()
            .ok_or(LegacyPayloadError::MissingMark(offset))?;
        if mark > self.stack.len() {
            return Err(LegacyPayloadError::StackUnderflow(offset));
        }
        Ok(self.stack.split_off(mark))
    }

    /// Move an item into the arena. References are already shared and stay
    /// as they are, so the arena never holds a reference.
    fn share(&mut self, item: Item) -> usize {
        match item {
            Item::Ref(index) => index,
            item => {
                self.shared.push(item);
                self.shared.len() - 1
            }
        }
    }

    /// Move the stack top into the memo, leaving a reference in its place.
    fn memoize(&mut self, id: u32, offset: usize) -> Result<()> {
        let item = self.pop(offset)?;
        let index = self.share(item);
        self.memo.insert(id, index);
        self.stack.push(Item::Ref(index));
        Ok(())
    }

    /// The container at the top of the stack, following a shared reference.
    fn target_mut(&mut self, offset: usize) -> Result<&mut Item> {
        let shared_index = match self.stack.last() {
            Some(Item::Ref(index)) => Some(*index),
            _ => None,
        };
        match shared_index {
            Some(index) => self.shared.get_mut(index).ok_or(LegacyPayloadError::Invalid {
                what: "reference",
                offset,
            }),
            None => self
                .stack
                .last_mut()
                .ok_or(LegacyPayloadError::StackUnderflow(offset)),
        }
    }

    fn extend_list(&mut self, items: Vec<Item>, offset: usize) -> Result<()> {
        match self.target_mut(offset)? {
            Item::List(list) => {
                list.extend(items);
                Ok(())
            }
            _ => Err(LegacyPayloadError::Invalid {
                what: "append target",
                offset,
            }),
        }
    }

    fn extend_dict(&mut self, pairs: Vec<(Item, Item)>, offset: usize) -> Result<()> {
        match self.target_mut(offset)? {
            Item::Dict(dict) => {
                dict.extend(pairs);
                Ok(())
            }
            _ => Err(LegacyPayloadError::Invalid {
                what: "setitem target",
                offset,
            }),
        }
    }

    /// Expand an item into JSON, spending `budget` as nodes are produced.
    fn resolve(&self, item: &Item, depth: usize, budget: &mut usize) -> Result<Value> {
        if depth > MAX_LEGACY_DEPTH {
            return Err(LegacyPayloadError::TooDeep);
        }
        match item {
            Item::Json(value) => {
                let cost = match value {
                    Value::String(s) => 1 + s.len(),
                    _ => 1,
                };
                spend(budget, cost)?;
                Ok(value.clone())
            }
            Item::List(items) => {
                spend(budget, 1)?;
                items
                    .iter()
                    .map(|item| self.resolve(item, depth + 1, budget))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            Item::Dict(pairs) => {
                spend(budget, 1)?;
                let mut map = Map::new();
                for (key, value) in pairs {
                    let key = map_key(&self.resolve(key, depth + 1, budget)?);
                    map.insert(key, self.resolve(value, depth + 1, budget)?);
                }
                Ok(Value::Object(map))
            }
            Item::Ref(index) => {
                let target = self.shared.get(*index).ok_or(LegacyPayloadError::Invalid {
                    what: "reference",
                    offset: self.pos,
                })?;
                self.resolve(target, depth + 1, budget)
            }
        }
    }
}

fn spend(budget: &mut usize, cost: usize) -> Result<()> {
    *budget = budget
        .checked_sub(cost)
        .ok_or(LegacyPayloadError::TooLarge)?;
    Ok(())
}

fn into_pairs(items: Vec<Item>, offset: usize) -> Result<Vec<(Item, Item)>> {
    if items.len() % 2 != 0 {
        return Err(LegacyPayloadError::Invalid {
            what: "key/value sequence",
            offset,
        });
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn parse_int(text: &str, offset: usize) -> Result<i64> {
    text.trim().parse().map_err(|_| LegacyPayloadError::Invalid {
        what: "integer",
        offset,
    })
}

fn parse_memo_id(text: &str, offset: usize) -> Result<u32> {
    text.trim().parse().map_err(|_| LegacyPayloadError::Invalid {
        what: "memo id",
        offset,
    })
}

/// Little-endian two's complement, at most 8 bytes.
fn decode_long(bytes: &[u8], offset: usize) -> Result<Value> {
    if bytes.len() > 8 {
        return Err(LegacyPayloadError::Invalid {
            what: "long",
            offset,
        });
    }
    let negative = bytes.last().is_some_and(|b| b & 0x80 != 0);
    let mut buf = if negative { [0xff; 8] } else { [0; 8] };
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(Value::from(i64::from_le_bytes(buf)))
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|t| t.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}
