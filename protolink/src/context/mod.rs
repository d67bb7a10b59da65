//! Per-file semantic state: symbols, extensions and import edges.

mod extensions;
mod symbols;

pub use self::symbols::Conflict;

pub(crate) use self::{extensions::ExtensionRegistry, symbols::SymbolTable};

use std::{
    collections::{HashSet, VecDeque},
    path::{Path, PathBuf},
    sync::Arc,
};

use protolink_parse::Span;

use crate::{
    error::CheckError,
    model::{ExtensionId, FileId, Proto, UserType},
};

/// Everything known about one loaded file.
///
/// Contexts are owned by a [`Module`](crate::Module) and form an import graph. A context only
/// ever refers to files loaded before it.
#[derive(Debug)]
pub struct ProtoContext {
    pub(crate) proto: Proto,
    pub(crate) symbols: SymbolTable,
    pub(crate) imports: Imports,
    pub(crate) extensions: ExtensionRegistry,
    pub(crate) initialized: bool,
    pub(crate) is_root: bool,
    pub(crate) path: Option<PathBuf>,
    pub(crate) source: String,
}

/// The files imported by a context, split by visibility.
#[derive(Debug, Default)]
pub(crate) struct Imports {
    pub public: Vec<FileId>,
    /// Plain and weak imports.
    pub private: Vec<FileId>,
}

impl ProtoContext {
    pub(crate) fn new(proto: Proto, path: Option<PathBuf>, source: String) -> Self {
        ProtoContext {
            proto,
            symbols: SymbolTable::default(),
            imports: Imports::default(),
            extensions: ExtensionRegistry::default(),
            initialized: false,
            is_root: false,
            path,
            source,
        }
    }

    /// The model of this file.
    pub fn proto(&self) -> &Proto {
        &self.proto
    }

    /// Names that were registered more than once while loading this file.
    pub fn conflicts(&self) -> &[Conflict] {
        self.symbols.conflicts()
    }

    /// Whether every stage of the pipeline completed for this file.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The file system path, if this file was read from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Files imported with `import public`.
    pub fn public_imports(&self) -> &[FileId] {
        &self.imports.public
    }

    /// Files imported without `public`.
    pub fn private_imports(&self) -> &[FileId] {
        &self.imports.private
    }

    /// Registers a fully-qualified name declared in this file.
    ///
    /// A name already declared in this file or in any file loaded before it, whether imported or
    /// not, is either replaced and recorded as a conflict, or rejected when `strict` is set.
    pub(crate) fn register(
        &mut self,
        loaded: &[ProtoContext],
        full_name: String,
        ty: UserType,
        span: Span,
        strict: bool,
    ) -> Result<(), CheckError> {
        let previous = self
            .symbols
            .get(&full_name)
            .or_else(|| self.resolve_in_imports(loaded, &full_name))
            .or_else(|| loaded.iter().rev().find_map(|ctx| ctx.symbols.get(&full_name)));

        if let Some(previous) = previous {
            let previous_file = self.file_name_of(loaded, previous).to_owned();
            if strict {
                return Err(CheckError::DuplicateName {
                    name: full_name,
                    help: Some(format!("it was previously defined in '{}'", previous_file)),
                    span: Some(span.into()),
                });
            }

            tracing::warn!(
                name = %full_name,
                file = %self.proto.file_name,
                %previous_file,
                "name registered twice, keeping the later declaration"
            );
            self.symbols.add_conflict(Conflict {
                name: full_name.clone(),
                previous,
                current: ty,
            });
        }

        self.symbols.insert(full_name, ty);
        Ok(())
    }

    /// Looks up a fully-qualified name as seen from this file.
    ///
    /// Checks this file, then everything visible from each public import, then each private
    /// import through [`resolve_import`](ProtoContext::resolve_import).
    pub(crate) fn resolve(&self, loaded: &[ProtoContext], name: &str) -> Option<UserType> {
        self.symbols
            .get(name)
            .or_else(|| self.resolve_in_imports(loaded, name))
    }

    /// Looks up a name as seen by a file importing this one: local names plus those re-exported
    /// through `import public`, never private imports.
    pub(crate) fn resolve_import(&self, loaded: &[ProtoContext], name: &str) -> Option<UserType> {
        self.symbols.get(name).or_else(|| {
            self.imports
                .public
                .iter()
                .find_map(|&id| loaded[id.index()].resolve_import(loaded, name))
        })
    }

    fn resolve_in_imports(&self, loaded: &[ProtoContext], name: &str) -> Option<UserType> {
        let result = self
            .imports
            .public
            .iter()
            .find_map(|&id| loaded[id.index()].resolve(loaded, name))
            .or_else(|| {
                self.imports
                    .private
                    .iter()
                    .find_map(|&id| loaded[id.index()].resolve_import(loaded, name))
            });
        if result.is_some() {
            tracing::trace!(name, file = %self.proto.file_name, "resolved name through imports");
        }
        result
    }

    /// The extensions of `extendee` visible from this file.
    ///
    /// Merges the extensions declared here with those declared in each direct import, then
    /// breadth-first through `import public` edges. Each file contributes once.
    pub(crate) fn extensions_for(
        &self,
        loaded: &[ProtoContext],
        extendee: &str,
    ) -> Arc<[ExtensionId]> {
        if let Some(cached) = self.extensions.cached(extendee) {
            return cached;
        }

        let mut result = self.extensions.local(extendee).to_vec();

        let mut visited = HashSet::new();
        visited.insert(self.proto.id);
        let mut queue: VecDeque<FileId> = self
            .imports
            .public
            .iter()
            .chain(&self.imports.private)
            .copied()
            .collect();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }

            let import = &loaded[id.index()];
            result.extend_from_slice(import.extensions.local(extendee));
            queue.extend(import.imports.public.iter().copied());
        }

        tracing::trace!(
            extendee,
            file = %self.proto.file_name,
            count = result.len(),
            "aggregated extensions"
        );
        let result: Arc<[ExtensionId]> = result.into();
        self.extensions.store(extendee, Arc::clone(&result));
        result
    }

    fn file_name_of<'a>(&'a self, loaded: &'a [ProtoContext], ty: UserType) -> &'a str {
        let file = match ty {
            UserType::Message(id) => id.file(),
            UserType::Enum(id) => id.file(),
            UserType::Service(id) => id.file(),
        };
        if file == self.proto.id {
            &self.proto.file_name
        } else {
            &loaded[file.index()].proto.file_name
        }
    }
}
