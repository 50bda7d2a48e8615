//! Raw bindings to the small slice of `libzvbi` this crate needs.
//!
//! Hand-written `extern "C"` declarations for exactly the entry points
//! used, not a full `bindgen`-generated surface. `vbi_dvb_demux` and
//! `vbi_decoder` are fully opaque and never read field-by-field on the
//! Rust side. `vbi_page`/`vbi_char`/`vbi_event` are *not* opaque to the
//! real library -- `vbi_fetch_vt_page` populates a `vbi_page` in place --
//! so their field layout here must track libzvbi's public header
//! (`src/page.h`, `src/event.h`, `src/network.h`) rather than being
//! trimmed to "only what we read": a `vbi_page` leads with a
//! `vbi_decoder *` back-pointer, an embedded `vbi_network`, `pgno`,
//! `subno`, then `rows`/`columns`, before the inline `text[25 * 64]`
//! character grid (the array is fixed at 64 columns per row regardless
//! of how many are actually used, to cover Level 2.5's wider pages).
//! `vbi_page` is therefore several kilobytes, not a handful of scalars,
//! and is always heap-allocated here (`vbi_page::new_zeroed`), never
//! placed on the stack.

#![allow(non_camel_case_types)]

use libc::{c_int, c_uint, c_void};

/// Opaque DVB Teletext demultiplexer handle (`struct vbi_dvb_demux`).
#[repr(C)]
pub struct vbi_dvb_demux {
    _private: [u8; 0],
}

/// Opaque Teletext page-decoder handle (`struct vbi_decoder`).
#[repr(C)]
pub struct vbi_decoder {
    _private: [u8; 0],
}

/// One sliced VBI/Teletext data line, as produced by the demuxer and
/// consumed by the decoder.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct vbi_sliced {
    pub id: u32,
    pub line: u32,
    pub data: [u8; 56],
}

impl Default for vbi_sliced {
    fn default() -> Self {
        vbi_sliced {
            id: 0,
            line: 0,
            data: [0u8; 56],
        }
    }
}

/// Maximum sliced lines `vbi_dvb_demux_cor` may produce in one call.
pub const MAX_SLICED_LINES: usize = 64;

/// One decoded Teletext character cell.
///
/// The real `vbi_char` is a C bitfield struct (`unicode:16`,
/// `foreground:8`, `background:8`, then a second word of smaller
/// attribute bits). GCC/Clang pack consecutive bitfields into `unsigned`
/// (4-byte) storage units in declaration order on the little-endian
/// platforms this crate targets, so the first word holds `unicode` in
/// its low 16 bits. Only that word is ever read here; the second word is
/// carried as an opaque `u32` to keep `size_of::<vbi_char>()` (8 bytes)
/// matching the real struct, which fixes `text[]` indexing for every row
/// past the first.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct vbi_char {
    attrs_lo: u32,
    attrs_hi: u32,
}

impl vbi_char {
    /// Unicode codepoint of this cell (low 16 bits of the first
    /// bitfield word).
    pub fn unicode(&self) -> u32 {
        self.attrs_lo & 0xFFFF
    }
}

impl Default for vbi_char {
    fn default() -> Self {
        vbi_char {
            attrs_lo: 0,
            attrs_hi: 0,
        }
    }
}

/// Row stride of the real inline `text[]` grid: libzvbi always allocates
/// 64 columns per row in `vbi_page`, independent of `columns` (40 for a
/// classic ETSI 300 706 page); reading `text[row * columns + col]`
/// instead of `text[row * 64 + col]` would silently misindex every row
/// past the first.
pub const VBI_PAGE_TEXT_STRIDE: usize = 64;

/// Number of rows the inline `text[]` grid is sized for.
pub const VBI_PAGE_TEXT_ROWS: usize = 25;

/// Opaque placeholder for the embedded `vbi_network` that libzvbi's
/// `vbi_page` carries between the page number and the row/column counts
/// (channel name, call sign, CNI identifiers). No field in it is read
/// here; only its size contributes to locating `rows`/`columns`/`text`
/// at the right offset. Sized generously against libzvbi's published
/// `vbi_network` (a 64-byte name, a call-sign buffer, four CNI integers
/// and a 64-bit user data word).
const VBI_NETWORK_RESERVED: usize = 144;

/// A fetched Teletext page grid, laid out to match libzvbi's real
/// `vbi_page` far enough to read `rows`, `columns` and the `text[]`
/// grid safely. Trailing fields the real struct has after `text[]`
/// (double-height markers, FLOF navigation links, aspect ratio) are
/// never read here; `trailing_reserved` below reserves headroom for them
/// so `vbi_fetch_vt_page` populating the real, larger struct never
/// writes past this allocation.
#[repr(C)]
pub struct vbi_page {
    pub vbi: *mut vbi_decoder,
    pub pgno: c_int,
    pub subno: c_int,
    network_reserved: [u8; VBI_NETWORK_RESERVED],
    page_type_reserved: c_int,
    pub rows: c_int,
    pub columns: c_int,
    pub text: [vbi_char; VBI_PAGE_TEXT_ROWS * VBI_PAGE_TEXT_STRIDE],
    trailing_reserved: [u8; 2048],
}

impl vbi_page {
    /// Allocate a zeroed page directly on the heap. Every field here is
    /// plain data (pointers, integers, byte arrays) for which an
    /// all-zero bit pattern is valid, so this never exposes
    /// uninitialised memory; `vbi_fetch_vt_page` overwrites the fields it
    /// populates, and callers never read this before a successful fetch.
    pub fn new_zeroed() -> Box<Self> {
        // SAFETY: `vbi_page` contains no references, and a
        // zero-initialised pointer/integer/byte-array struct is a valid
        // bit pattern for all of its fields.
        unsafe { Box::new(std::mem::zeroed()) }
    }
}

/// Event mask bit: a Teletext page has finished assembly.
pub const VBI_EVENT_TTX_PAGE: c_int = 1 << 1;

/// Enhancement level requested when fetching a page: Level 1.5, which
/// enables national character sets.
pub const VBI_WST_LEVEL_1P5: c_int = 1;

/// Minimal view of `vbi_event`: only the Teletext page-number union
/// members this crate reads.
#[repr(C)]
pub struct vbi_event_ttx_page {
    pub pgno: c_int,
    pub subno: c_int,
}

#[repr(C)]
pub struct vbi_event {
    pub ev_type: c_int,
    /// The real `vbi_event` carries a `vbi_network *network` field
    /// between `type` and its payload union; never dereferenced here, but
    /// its presence (and pointer-width alignment) is required to land
    /// `ttx_page` at the correct offset instead of reading into what is
    /// actually this pointer's bytes.
    network: *mut c_void,
    pub ttx_page: vbi_event_ttx_page,
}

pub type vbi_event_handler =
    unsafe extern "C" fn(ev: *mut vbi_event, user_data: *mut c_void);

#[link(name = "zvbi")]
extern "C" {
    pub fn vbi_dvb_demux_new(
        callback: Option<unsafe extern "C" fn(*mut c_void, *const vbi_sliced, c_uint, f64)>,
        user_data: *mut c_void,
    ) -> *mut vbi_dvb_demux;
    pub fn vbi_dvb_demux_delete(dx: *mut vbi_dvb_demux);
    pub fn vbi_dvb_demux_cor(
        dx: *mut vbi_dvb_demux,
        sliced: *mut vbi_sliced,
        sliced_lines: c_uint,
        pts: *mut i64,
        buffer: *mut *const u8,
        buffer_left: *mut c_uint,
    ) -> c_uint;

    pub fn vbi_decoder_new() -> *mut vbi_decoder;
    pub fn vbi_decoder_delete(vbi: *mut vbi_decoder);
    pub fn vbi_decode(
        vbi: *mut vbi_decoder,
        sliced: *const vbi_sliced,
        n_lines: c_uint,
        timestamp: f64,
    );
    pub fn vbi_event_handler_register(
        vbi: *mut vbi_decoder,
        event_mask: c_int,
        handler: vbi_event_handler,
        user_data: *mut c_void,
    ) -> c_int;
    pub fn vbi_event_handler_unregister(
        vbi: *mut vbi_decoder,
        handler: vbi_event_handler,
        user_data: *mut c_void,
    );
    pub fn vbi_fetch_vt_page(
        vbi: *mut vbi_decoder,
        pg: *mut vbi_page,
        pgno: c_int,
        subno: c_int,
        max_level: c_int,
        display_rows: c_int,
        navigation: c_int,
    ) -> c_int;
    pub fn vbi_unref_page(pg: *mut vbi_page);
}
