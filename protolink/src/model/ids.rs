/// Identifies a loaded file within a [`Module`](crate::Module).
///
/// Files are numbered in load order, so a file always has a larger id than any file it imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) u32);

impl FileId {
    pub(crate) fn new(index: usize) -> Self {
        FileId(to_u32(index))
    }

    /// The position of this file in load order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

macro_rules! declaration_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            pub(crate) file: FileId,
            pub(crate) index: u32,
        }

        impl $name {
            pub(crate) fn new(file: FileId, index: usize) -> Self {
                $name {
                    file,
                    index: to_u32(index),
                }
            }

            /// The file that declares this item.
            pub fn file(self) -> FileId {
                self.file
            }

            pub(crate) fn index(self) -> usize {
                self.index as usize
            }
        }
    };
}

declaration_id!(
    /// Identifies a message, at any nesting depth.
    MessageId
);
declaration_id!(
    /// Identifies an enum, at any nesting depth.
    EnumId
);
declaration_id!(
    /// Identifies a service.
    ServiceId
);
declaration_id!(
    /// Identifies an `extend` block.
    ExtensionId
);

fn to_u32(index: usize) -> u32 {
    // Source files are at most i32::MAX bytes, so declaration counts always fit.
    u32::try_from(index).expect("index out of range")
}
