use std::{collections::HashMap, ops::Index, sync::Arc};

use crate::{
    context::ProtoContext,
    model::{
        Enum, EnumId, Extension, ExtensionId, Field, FileId, Message, MessageId, Proto, Service,
        ServiceId, UserType,
    },
};

/// A set of loaded files and their resolved declarations.
///
/// Files are stored in load order, so every file comes after the files it imports. Declarations
/// are reached from a [`Proto`] through typed ids, which are followed with the `Index` impls:
///
/// ```
/// # use protolink::{Compiler, file::{File, FileResolver}, Error};
/// # struct Sources;
/// # impl FileResolver for Sources {
/// #     fn open_file(&self, name: &str) -> Result<File, Error> {
/// #         match name {
/// #             "root.proto" => File::from_source(name, "package pkg; message Foo { Bar bar = 1; } message Bar {}"),
/// #             _ => Err(Error::file_not_found(name)),
/// #         }
/// #     }
/// # }
/// let mut compiler = Compiler::with_file_resolver(Sources);
/// compiler.open_file("root.proto").unwrap();
/// let module = compiler.into_module();
///
/// let foo = module.get_message_by_name("pkg.Foo").unwrap();
/// assert_eq!(module[foo].full_name, ".pkg.Foo");
/// assert_eq!(module[foo].fields[0].name, "bar");
/// ```
#[derive(Debug, Default)]
pub struct Module {
    pub(crate) contexts: Vec<ProtoContext>,
    pub(crate) names: HashMap<String, FileId>,
}

impl Module {
    /// Every loaded file, imports before the files importing them.
    pub fn files(&self) -> impl ExactSizeIterator<Item = &Proto> + '_ {
        self.contexts.iter().map(ProtoContext::proto)
    }

    /// The number of loaded files.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no file has been loaded.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Finds a file by the name used to import it.
    pub fn file_by_name(&self, name: &str) -> Option<&Proto> {
        self.names.get(name).map(|&id| &self[id])
    }

    /// The semantic state of a file, including recorded name conflicts.
    pub fn context(&self, file: FileId) -> &ProtoContext {
        &self.contexts[file.index()]
    }

    /// Finds a message by fully-qualified name, with or without the leading `.`.
    ///
    /// If the name was declared in several files, the most recently loaded one is returned and the
    /// clash is recorded in that file's [`ProtoContext::conflicts`].
    pub fn get_message_by_name(&self, name: &str) -> Option<MessageId> {
        match self.get_by_name(name)? {
            UserType::Message(id) => Some(id),
            _ => None,
        }
    }

    /// Finds an enum by fully-qualified name, with or without the leading `.`.
    pub fn get_enum_by_name(&self, name: &str) -> Option<EnumId> {
        match self.get_by_name(name)? {
            UserType::Enum(id) => Some(id),
            _ => None,
        }
    }

    /// Finds a service by fully-qualified name, with or without the leading `.`.
    pub fn get_service_by_name(&self, name: &str) -> Option<ServiceId> {
        match self.get_by_name(name)? {
            UserType::Service(id) => Some(id),
            _ => None,
        }
    }

    /// Looks up a fully-qualified name as seen from `file`, honoring import visibility.
    pub fn resolve(&self, file: FileId, name: &str) -> Option<UserType> {
        self.context(file)
            .resolve(&self.contexts, &qualify(name))
    }

    /// The extensions of `extendee` visible from `file`.
    ///
    /// This merges the extensions declared in `file` with those of the files it imports, following
    /// `import public` transitively. Results are cached per file and extendee.
    pub fn extensions(&self, file: FileId, extendee: &str) -> Arc<[ExtensionId]> {
        self.context(file)
            .extensions_for(&self.contexts, &qualify(extendee))
    }

    /// Every loaded `extend` block targeting `message`, regardless of visibility.
    pub fn message_extensions(&self, message: MessageId) -> Vec<ExtensionId> {
        let full_name = &self[message].full_name;
        self.contexts
            .iter()
            .flat_map(|ctx| ctx.extensions.local(full_name))
            .copied()
            .filter(|&id| self[id].extendee == Some(message))
            .collect()
    }

    /// Finds an extension field of `extendee` visible from `file` by its fully-qualified name.
    pub fn get_extension_field(
        &self,
        file: FileId,
        extendee: &str,
        full_name: &str,
    ) -> Option<(ExtensionId, &Field)> {
        let full_name = qualify(full_name);
        self.extensions(file, extendee).iter().find_map(|&id| {
            let extension = &self[id];
            extension
                .fields
                .iter()
                .find(|field| extension.field_full_name(field) == full_name)
                .map(|field| (id, field))
        })
    }

    fn get_by_name(&self, name: &str) -> Option<UserType> {
        let name = qualify(name);
        self.contexts
            .iter()
            .rev()
            .find_map(|ctx| ctx.symbols.get(&name))
    }
}

fn qualify(name: &str) -> String {
    if name.starts_with('.') {
        name.to_owned()
    } else {
        format!(".{}", name)
    }
}

impl Index<FileId> for Module {
    type Output = Proto;

    fn index(&self, id: FileId) -> &Proto {
        &self.contexts[id.index()].proto
    }
}

impl Index<MessageId> for Module {
    type Output = Message;

    fn index(&self, id: MessageId) -> &Message {
        &self[id.file()][id]
    }
}

impl Index<EnumId> for Module {
    type Output = Enum;

    fn index(&self, id: EnumId) -> &Enum {
        &self[id.file()][id]
    }
}

impl Index<ServiceId> for Module {
    type Output = Service;

    fn index(&self, id: ServiceId) -> &Service {
        &self[id.file()][id]
    }
}

impl Index<ExtensionId> for Module {
    type Output = Extension;

    fn index(&self, id: ExtensionId) -> &Extension {
        &self[id.file()][id]
    }
}
