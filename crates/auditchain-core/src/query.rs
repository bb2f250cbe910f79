//! Read-only, filtered access to a tenant's events.
//!
//! The query service scans the chain in bounded chunks and never mutates
//! anything. Results may legitimately skip sequences (that is what filtering
//! does); pagination cursors encode chain positions, never digests.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use auditchain_contracts::{
    block::Block,
    error::LedgerResult,
    event::TenantId,
    query::{Cursor, EventFilter, Page, PageRequest, RecordedEvent},
};

use crate::traits::ChainStore;

/// Tunables for the query service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Page size used when a request asks for `limit == 0`.
    pub default_page_size: usize,
    /// Requests above this are clamped down to it.
    pub max_page_size: usize,
    /// Blocks fetched from the store per read while scanning.
    pub scan_chunk_size: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
            scan_chunk_size: 256,
        }
    }
}

/// Filtered, paginated reads over the chain store.
pub struct QueryService {
    store: Arc<dyn ChainStore>,
    settings: QuerySettings,
}

impl QueryService {
    pub fn new(store: Arc<dyn ChainStore>, settings: QuerySettings) -> Self {
        Self { store, settings }
    }

    /// Lazily iterate matching events from `start_sequence` up to the head
    /// observed now. Blocks appended later are not visited.
    pub fn stream(
        &self,
        tenant_id: &TenantId,
        filter: EventFilter,
        start_sequence: u64,
    ) -> LedgerResult<EventStream> {
        let end = self.store.head(tenant_id)?.map(|h| h.sequence());
        Ok(EventStream {
            store: Arc::clone(&self.store),
            tenant_id: tenant_id.clone(),
            filter,
            next: start_sequence,
            end,
            chunk: self.settings.scan_chunk_size.max(1),
            buffer: VecDeque::new(),
            failed: false,
        })
    }

    /// One page of matching events.
    ///
    /// `next_cursor` is `None` once the scan reached the head snapshot.
    pub fn find(
        &self,
        tenant_id: &TenantId,
        filter: &EventFilter,
        page: PageRequest,
    ) -> LedgerResult<Page> {
        let limit = match page.limit {
            0 => self.settings.default_page_size,
            n => n.min(self.settings.max_page_size),
        }
        .max(1);
        let start = page.cursor.map_or(0, |c| c.next_sequence());

        let mut stream = self.stream(tenant_id, filter.clone(), start)?;
        let mut events = Vec::with_capacity(limit);
        while events.len() < limit {
            match stream.next() {
                Some(item) => events.push(item?),
                None => break,
            }
        }

        let next_cursor = if events.len() == limit && !stream.is_exhausted() {
            Some(Cursor::at(stream.position()))
        } else {
            None
        };

        debug!(
            tenant_id = %tenant_id,
            start,
            returned = events.len(),
            more = next_cursor.is_some(),
            "query page served"
        );

        Ok(Page {
            events,
            next_cursor,
        })
    }
}

/// Lazy, chunked iterator over matching events.
pub struct EventStream {
    store: Arc<dyn ChainStore>,
    tenant_id: TenantId,
    filter: EventFilter,
    /// Next sequence to read from the store.
    next: u64,
    /// Head snapshot; `None` for an empty chain.
    end: Option<u64>,
    chunk: u64,
    buffer: VecDeque<Block>,
    failed: bool,
}

impl EventStream {
    /// The sequence a follow-up scan should resume from.
    pub fn position(&self) -> u64 {
        self.buffer.front().map_or(self.next, Block::sequence)
    }

    /// True once every block up to the head snapshot has been visited.
    pub fn is_exhausted(&self) -> bool {
        self.failed || (self.buffer.is_empty() && self.end.map_or(true, |end| self.next > end))
    }

    fn refill(&mut self) -> LedgerResult<()> {
        let Some(end) = self.end else {
            return Ok(());
        };
        if self.next > end {
            return Ok(());
        }
        let last = end.min(self.next.saturating_add(self.chunk - 1));
        let blocks = self.store.range(&self.tenant_id, self.next, last)?;
        self.next = last + 1;
        self.buffer.extend(blocks);
        Ok(())
    }
}

impl Iterator for EventStream {
    type Item = LedgerResult<RecordedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if self.buffer.is_empty() {
                if let Err(e) = self.refill() {
                    self.failed = true;
                    return Some(Err(e));
                }
                if self.buffer.is_empty() {
                    return None;
                }
            }

            while let Some(block) = self.buffer.pop_front() {
                if self.filter.matches(&block.event) {
                    return Some(Ok(RecordedEvent {
                        sequence: block.header.sequence,
                        commit_time: block.header.commit_time,
                        event: block.event,
                    }));
                }
            }
        }
    }
}
