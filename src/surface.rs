//! Display surface contract
//!
//! The transient viewer is an external collaborator; the
//! pipeline only needs the render half of its
//! create / render / destroy lifecycle. Rendered text replaces
//! all prior content and the surface is read-only to the user
//! afterwards.

use log::debug;

/// Anything the resolved text can be rendered into
pub trait DisplaySurface
{   /// Replace the surface's entire content with markdown text
    fn render(&mut self, text: &str)
      -> Result<(), crate::error::Error>;
}

/// In-memory surface used by embedders and tests
#[derive(Debug, Default)]
pub struct BufferSurface
{   content: Option<String>
}

impl BufferSurface
{   pub fn create() -> Self
    {   debug!("Creating BufferSurface");
        BufferSurface { content: None }
    }

    /// Content of the last render, if any
    pub fn content(&self) -> Option<&str>
    {   self.content.as_deref()
    }

    pub fn destroy(self)
    {   debug!("Destroying BufferSurface");
    }
}

impl DisplaySurface for BufferSurface
{   fn render(&mut self, text: &str)
      -> Result<(), crate::error::Error>
    {   self.content = Some(text.to_string());
        Ok(())
    }
}
