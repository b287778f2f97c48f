use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use verdant_core::error::VerdantError;
use verdant_core::event::Event;
use verdant_core::types::{Address, Timestamp};

use crate::call::Receipt;
use crate::chain::{ChainState, Contract};

const HEADER_KEY: &[u8] = b"header";
const TOKEN_KEY: &[u8] = b"token";
const NATIVE_KEY: &[u8] = b"native";
const VESTING_KEY: &[u8] = b"vesting";

/// Persistent chain database backed by sled.
///
/// Named trees:
///   state:     "header" | "token" | "native" | "vesting" → bincode(component)
///   contracts: contract address bytes                     → bincode(Contract)
///   receipts:  call index (u64 BE)                        → bincode(Receipt)
///   events:    call index (u64 BE) ++ seq (u32 BE)        → bincode(Event)
///   meta:      utf8 key bytes                             → raw bytes
///
/// A commit writes the state components, the contracts the call touched, its
/// receipt and its events in one transaction.
pub struct StateDb {
    db: sled::Db,
    state: sled::Tree,
    contracts: sled::Tree,
    receipts: sled::Tree,
    events: sled::Tree,
    meta: sled::Tree,
}

#[derive(Serialize)]
struct HeaderRef<'a> {
    deploy_nonces: &'a BTreeMap<Address, u64>,
    last_time: Timestamp,
    height: u64,
}

#[derive(Deserialize)]
struct Header {
    deploy_nonces: BTreeMap<Address, u64>,
    last_time: Timestamp,
    height: u64,
}

fn storage(e: sled::Error) -> VerdantError {
    VerdantError::Storage(e.to_string())
}

fn serialization(e: bincode::Error) -> VerdantError {
    VerdantError::Serialization(e.to_string())
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, VerdantError> {
    bincode::serialize(value).map_err(serialization)
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, VerdantError> {
    bincode::deserialize(bytes).map_err(serialization)
}

fn event_key(index: u64, seq: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(12);
    key.extend_from_slice(&index.to_be_bytes());
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

impl StateDb {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VerdantError> {
        let db = sled::open(path).map_err(storage)?;
        let state = db.open_tree("state").map_err(storage)?;
        let contracts = db.open_tree("contracts").map_err(storage)?;
        let receipts = db.open_tree("receipts").map_err(storage)?;
        let events = db.open_tree("events").map_err(storage)?;
        let meta = db.open_tree("meta").map_err(storage)?;
        Ok(Self { db, state, contracts, receipts, events, meta })
    }

    // ── Chain state ───────────────────────────────────────────────────────────

    fn component<T: for<'de> Deserialize<'de>>(&self, key: &[u8]) -> Result<T, VerdantError> {
        let bytes = self.state.get(key).map_err(storage)?.ok_or_else(|| {
            VerdantError::Storage(format!("missing state component {}", String::from_utf8_lossy(key)))
        })?;
        decode(&bytes)
    }

    pub fn get_state(&self) -> Result<Option<ChainState>, VerdantError> {
        let header: Header = match self.state.get(HEADER_KEY).map_err(storage)? {
            Some(bytes) => decode(&bytes)?,
            None => return Ok(None),
        };
        let mut contracts = BTreeMap::new();
        for item in self.contracts.iter() {
            let (key, bytes) = item.map_err(storage)?;
            let raw: [u8; 20] = key[..]
                .try_into()
                .map_err(|_| VerdantError::Storage("malformed contract key".into()))?;
            let address = Address::from_bytes(raw);
            contracts.insert(address, decode::<Contract>(&bytes)?);
        }
        Ok(Some(ChainState::from_parts(
            self.component(TOKEN_KEY)?,
            self.component(NATIVE_KEY)?,
            self.component(VESTING_KEY)?,
            contracts,
            header.deploy_nonces,
            header.last_time,
            header.height,
        )))
    }

    pub fn has_state(&self) -> bool {
        self.state.contains_key(HEADER_KEY).unwrap_or(false)
    }

    /// Write the committed state together with the receipt and events of the
    /// call that produced it.
    pub fn commit(
        &self,
        state: &ChainState,
        receipt: Option<&Receipt>,
        events: &[Event],
    ) -> Result<(), VerdantError> {
        let header = HeaderRef {
            deploy_nonces: &state.deploy_nonces,
            last_time: state.last_time,
            height: state.height,
        };
        let components = [
            (HEADER_KEY, encode(&header)?),
            (TOKEN_KEY, encode(&state.token)?),
            (NATIVE_KEY, encode(&state.native)?),
            (VESTING_KEY, encode(&state.vesting)?),
        ];
        let contracts = state
            .touched_contracts()
            .map(|(address, c)| -> Result<_, VerdantError> { Ok((address.as_bytes().to_vec(), encode(c)?)) })
            .collect::<Result<Vec<_>, VerdantError>>()?;
        let receipt = match receipt {
            Some(r) => Some((r.index.to_be_bytes().to_vec(), encode(r)?)),
            None => None,
        };
        let index = state.height;
        let events = events
            .iter()
            .enumerate()
            .map(|(seq, e)| -> Result<_, VerdantError> { Ok((event_key(index, seq as u32), encode(e)?)) })
            .collect::<Result<Vec<_>, VerdantError>>()?;

        (&self.state, &self.contracts, &self.receipts, &self.events)
            .transaction(|(state_tree, contract_tree, receipt_tree, event_tree)| {
                for (key, bytes) in &components {
                    state_tree.insert(*key, bytes.as_slice())?;
                }
                for (key, bytes) in &contracts {
                    contract_tree.insert(key.as_slice(), bytes.as_slice())?;
                }
                if let Some((key, bytes)) = &receipt {
                    receipt_tree.insert(key.as_slice(), bytes.as_slice())?;
                }
                for (key, bytes) in &events {
                    event_tree.insert(key.as_slice(), bytes.as_slice())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e: TransactionError<()>| VerdantError::Storage(format!("{:?}", e)))?;
        Ok(())
    }

    // ── Receipts ──────────────────────────────────────────────────────────────

    pub fn get_receipt(&self, index: u64) -> Result<Option<Receipt>, VerdantError> {
        match self.receipts.get(index.to_be_bytes()).map_err(storage)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Receipts in call order.
    pub fn receipts(&self) -> Result<Vec<Receipt>, VerdantError> {
        let mut out = Vec::new();
        for item in self.receipts.iter() {
            let (_, bytes) = item.map_err(storage)?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    // ── Events ────────────────────────────────────────────────────────────────

    /// Events emitted by the call with receipt `index`, in emission order.
    pub fn events_of(&self, index: u64) -> Result<Vec<Event>, VerdantError> {
        let mut out = Vec::new();
        for item in self.events.scan_prefix(index.to_be_bytes()) {
            let (_, bytes) = item.map_err(storage)?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    // ── Meta ──────────────────────────────────────────────────────────────────

    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), VerdantError> {
        self.meta.insert(key.as_bytes(), value).map_err(storage)?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, VerdantError> {
        self.meta
            .get(key.as_bytes())
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(storage)
    }

    /// Total bytes held by the state components.
    #[cfg(test)]
    pub(crate) fn state_bytes(&self) -> Result<usize, VerdantError> {
        let mut total = 0;
        for item in self.state.iter() {
            total += item.map_err(storage)?.1.len();
        }
        Ok(total)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), VerdantError> {
        self.db.flush().map_err(storage)?;
        Ok(())
    }
}
