//! Presentation objects owned by a device.
//!
//! The constructor paths create a default [`Swapchain`] with an attached
//! [`Framebuffer`]. A device may also run swapchain-less when presentation is
//! owned by someone else entirely; nothing in this crate may assume a main
//! swapchain exists.

/// Framebuffer backing a [`Swapchain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
}

impl Framebuffer {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// A device's presentation surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swapchain {
    framebuffer: Framebuffer,
    sync_to_vertical_blank: bool,
}

impl Swapchain {
    pub const fn new(width: u32, height: u32, sync_to_vertical_blank: bool) -> Self {
        Self {
            framebuffer: Framebuffer::new(width, height),
            sync_to_vertical_blank,
        }
    }

    pub const fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub const fn sync_to_vertical_blank(&self) -> bool {
        self.sync_to_vertical_blank
    }
}
