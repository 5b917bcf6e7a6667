//! Decoded display updates.
//!
//! The engine hands the boundary a batch of [`BitmapTile`]s per fetch.  Each
//! tile names the destination rectangle on the remote desktop and carries
//! the decoded pixels for it.  The boundary forwards tiles to the host in
//! exactly the order the engine produced them.

/// Destination rectangle of a tile, in desktop pixels.
///
/// `right` and `bottom` are inclusive, matching RDP bitmap update PDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRect {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl TileRect {
    /// Creates a rectangle from inclusive edges.
    pub fn new(left: u16, top: u16, right: u16, bottom: u16) -> Self {
        Self { left, top, right, bottom }
    }

    /// Returns `true` unless the rectangle is inverted on either axis.
    pub fn is_well_formed(&self) -> bool {
        self.right >= self.left && self.bottom >= self.top
    }

    /// Width in pixels, or 0 for an inverted rectangle.
    pub fn width(&self) -> u32 {
        if self.right < self.left {
            return 0;
        }
        u32::from(self.right - self.left) + 1
    }

    /// Height in pixels, or 0 for an inverted rectangle.
    pub fn height(&self) -> u32 {
        if self.bottom < self.top {
            return 0;
        }
        u32::from(self.bottom - self.top) + 1
    }
}

/// One rectangular region of decoded pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapTile {
    /// Where the pixels go on the remote desktop.
    pub rect: TileRect,
    /// Decoded pixel bytes, in the engine's output pixel format.
    pub pixels: Vec<u8>,
}

impl BitmapTile {
    /// Creates a tile from a rectangle and its pixel buffer.
    pub fn new(rect: TileRect, pixels: Vec<u8>) -> Self {
        Self { rect, pixels }
    }

    /// Number of initialised pixel bytes.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns `true` if the tile carries no pixel bytes.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Allocated capacity of the pixel buffer.
    pub fn capacity(&self) -> usize {
        self.pixels.capacity()
    }
}
