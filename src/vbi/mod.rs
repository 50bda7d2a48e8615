//! VBI bridge (component F).
//!
//! Feeds PES payload bytes into the external Teletext demuxer/decoder
//! (`libzvbi`) and surfaces "page complete" events synchronously, so the
//! caller can drain them on the same thread that called `feed` instead of
//! reacting from inside an asynchronous library callback.
//!
//! `demux` and `decoder` are destroyed and rebuilt together on every
//! (re)connect (`VbiBridge::new`/`Drop`); nothing here is shared across
//! connections.

mod ffi;

use std::cell::RefCell;

use libc::c_void;

use crate::error::Error;

/// A page-complete notification: page number and subpage, BCD-decoded
/// upstream by the library into plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEvent {
    /// 3-digit Teletext page number.
    pub page: u16,
    /// 16-bit subpage number.
    pub subpage: u16,
}

/// A fetched 40x25 (or fewer) Teletext page grid. Released on drop.
///
/// Heap-allocated (`ffi::vbi_page::new_zeroed`): the real `vbi_page` is
/// several kilobytes (a fixed 25*64 inline character grid plus leading
/// decoder/network bookkeeping fields), far too large to hand to
/// `vbi_fetch_vt_page` as a stack-local out-parameter.
pub struct PageGrid {
    inner: Box<ffi::vbi_page>,
}

impl PageGrid {
    /// Number of rows in the grid.
    pub fn rows(&self) -> usize {
        self.inner.rows.max(0) as usize
    }

    /// Number of columns in the grid.
    pub fn columns(&self) -> usize {
        self.inner.columns.max(0) as usize
    }

    /// Unicode codepoint of the cell at `(row, col)`.
    ///
    /// `text[]` is always laid out with a fixed 64-column stride
    /// regardless of `columns`, so the index is `row * stride + col`, not
    /// `row * columns + col`.
    ///
    /// # Panics
    /// Panics if `row`/`col` are out of bounds for this grid.
    pub fn codepoint(&self, row: usize, col: usize) -> u32 {
        assert!(row < self.rows() && col < self.columns());
        let idx = row * ffi::VBI_PAGE_TEXT_STRIDE + col;
        self.inner.text[idx].unicode()
    }
}

impl Drop for PageGrid {
    fn drop(&mut self) {
        // SAFETY: `inner` was populated by a successful `vbi_fetch_vt_page`
        // call and has not been released yet.
        unsafe { ffi::vbi_unref_page(self.inner.as_mut()) };
    }
}

impl crate::page::CellGrid for PageGrid {
    fn rows(&self) -> usize {
        PageGrid::rows(self)
    }
    fn columns(&self) -> usize {
        PageGrid::columns(self)
    }
    fn codepoint(&self, row: usize, col: usize) -> u32 {
        PageGrid::codepoint(self, row, col)
    }
}

/// Owns the demux and decoder handles for one connection's worth of
/// Teletext data.
pub struct VbiBridge {
    demux: *mut ffi::vbi_dvb_demux,
    decoder: *mut ffi::vbi_decoder,
    // Heap-stable storage for pending page-complete events, written by the
    // event trampoline via a raw pointer captured at registration time.
    pending: Box<RefCell<Vec<PageEvent>>>,
}

impl VbiBridge {
    /// Construct fresh demux and decoder handles and register the
    /// page-complete event callback. Call once per connection.
    pub fn new() -> Result<Self, Error> {
        let pending = Box::new(RefCell::new(Vec::new()));
        // SAFETY: `vbi_dvb_demux_new` takes an optional callback and an
        // opaque user-data pointer; neither is dereferenced until a
        // well-formed call to `vbi_dvb_demux_cor` happens below, and we
        // pass no callback (slicing results are read out of `demux_cor`'s
        // own output parameters instead).
        let demux = unsafe { ffi::vbi_dvb_demux_new(None, std::ptr::null_mut()) };
        if demux.is_null() {
            return Err(Error::VbiInit("vbi_dvb_demux_new returned null".into()));
        }
        // SAFETY: no preconditions beyond library initialisation.
        let decoder = unsafe { ffi::vbi_decoder_new() };
        if decoder.is_null() {
            // SAFETY: `demux` was just checked non-null and is otherwise
            // unused until construction completes.
            unsafe { ffi::vbi_dvb_demux_delete(demux) };
            return Err(Error::VbiInit("vbi_decoder_new returned null".into()));
        }

        let user_data = &*pending as *const RefCell<Vec<PageEvent>> as *mut c_void;
        // SAFETY: `decoder` was just checked non-null; `user_data` points
        // into `pending`'s heap allocation, which outlives this
        // registration (it is owned by the `VbiBridge` being constructed
        // and only freed in `Drop`, after `vbi_decoder_delete` below).
        unsafe {
            ffi::vbi_event_handler_register(
                decoder,
                ffi::VBI_EVENT_TTX_PAGE,
                on_page_event,
                user_data,
            );
        }

        Ok(Self {
            demux,
            decoder,
            pending,
        })
    }

    /// Feed PES payload bytes (the Teletext data-identifier and EBU data
    /// units following the PES header) into the demuxer, forwarding
    /// produced lines to the decoder. Loops until the buffer is consumed
    /// or the demuxer stalls (guards against an infinite spin on malformed
    /// input).
    pub fn feed(&mut self, payload: &[u8]) {
        let mut cursor = payload.as_ptr();
        let mut remaining = payload.len() as libc::c_uint;
        loop {
            if remaining == 0 {
                break;
            }
            let mut sliced = [ffi::vbi_sliced::default(); ffi::MAX_SLICED_LINES];
            let mut pts: i64 = 0;
            let remaining_before = remaining;
            // SAFETY: `self.demux` is valid for the lifetime of `self`;
            // `sliced` has exactly `MAX_SLICED_LINES` capacity matching
            // the count passed in; `cursor`/`remaining` describe the
            // still-unconsumed suffix of `payload`, which remains valid
            // for the duration of this call.
            let n_lines = unsafe {
                ffi::vbi_dvb_demux_cor(
                    self.demux,
                    sliced.as_mut_ptr(),
                    ffi::MAX_SLICED_LINES as libc::c_uint,
                    &mut pts,
                    &mut cursor,
                    &mut remaining,
                )
            };
            if n_lines == 0 && remaining == remaining_before {
                break;
            }
            if n_lines > 0 {
                let pts_seconds = pts as f64 / 90_000.0;
                // SAFETY: `self.decoder` is valid; `sliced[..n_lines]` was
                // just populated by `vbi_dvb_demux_cor` above.
                unsafe {
                    ffi::vbi_decode(self.decoder, sliced.as_ptr(), n_lines, pts_seconds);
                }
            }
        }
    }

    /// Drain and return any page-complete events produced by calls to
    /// `feed` since the last drain.
    pub fn drain_events(&mut self) -> Vec<PageEvent> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    /// Fetch the full grid for a completed page. Returns `None` if the
    /// page is no longer available; the caller should skip it silently.
    pub fn fetch_page(&self, page: u16, subpage: u16) -> Option<PageGrid> {
        let mut pg = ffi::vbi_page::new_zeroed();
        // SAFETY: `self.decoder` is valid; `pg` is a heap allocation sized
        // to hold the real `vbi_page` (including its inline 25*64
        // character grid) plus trailing headroom, not a small stack copy.
        let ok = unsafe {
            ffi::vbi_fetch_vt_page(
                self.decoder,
                pg.as_mut(),
                page as libc::c_int,
                subpage as libc::c_int,
                ffi::VBI_WST_LEVEL_1P5,
                25,
                1,
            )
        };
        if ok == 0 {
            return None;
        }
        Some(PageGrid { inner: pg })
    }
}

impl Drop for VbiBridge {
    fn drop(&mut self) {
        // SAFETY: both handles were successfully created in `new` and are
        // not used again after this point.
        unsafe {
            ffi::vbi_decoder_delete(self.decoder);
            ffi::vbi_dvb_demux_delete(self.demux);
        }
    }
}

unsafe extern "C" fn on_page_event(ev: *mut ffi::vbi_event, user_data: *mut c_void) {
    if ev.is_null() || user_data.is_null() {
        return;
    }
    // SAFETY: the library guarantees `ev` points to a valid event for the
    // duration of this callback; `user_data` is the pointer we registered
    // in `VbiBridge::new`, which is kept alive by the `VbiBridge` that
    // registered it.
    let ev = unsafe { &*ev };
    if ev.ev_type != ffi::VBI_EVENT_TTX_PAGE {
        return;
    }
    let pending = unsafe { &*(user_data as *const RefCell<Vec<PageEvent>>) };
    pending.borrow_mut().push(PageEvent {
        page: ev.ttx_page.pgno as u16,
        subpage: ev.ttx_page.subno as u16,
    });
}
