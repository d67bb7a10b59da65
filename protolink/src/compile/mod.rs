use std::{
    fmt::{self, Write},
    path::Path,
};

use crate::{
    build::build_proto,
    context::{Imports, ProtoContext},
    error::{CheckError, Error, ErrorKind},
    file::{check_shadow, path_to_file_name, File, FileResolver},
    model::{ExtensionId, FileId, MessageId, Parent, Proto},
    registrar::register_types,
    resolve::resolve_types,
    validate::{default_validators, Validator},
    Module,
};


/// Loads protobuf files and their imports into a [`Module`].
///
/// Each file goes through the same stages: its imports are loaded first, then its declarations
/// are named and registered, type references are resolved, extensions are registered against
/// their extendees, and finally every [`Validator`] runs. A file that fails any stage is not
/// added to the module.
pub struct Compiler {
    module: Module,
    resolver: Box<dyn FileResolver>,
    validators: Vec<Box<dyn Validator>>,
    include_imports: bool,
    strict_names: bool,
}

impl Compiler {
    /// Creates a new [`Compiler`] which searches the given include paths, in order.
    pub fn new<I, P>(includes: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        use crate::file::{ChainFileResolver, IncludeFileResolver};

        let resolver: ChainFileResolver = includes
            .into_iter()
            .map(|include| IncludeFileResolver::new(include.as_ref()))
            .collect();

        Ok(Compiler::with_file_resolver(resolver))
    }

    /// Creates a new [`Compiler`] with a custom [`FileResolver`] for looking up files.
    pub fn with_file_resolver<R>(resolver: R) -> Self
    where
        R: FileResolver + 'static,
    {
        Compiler {
            module: Module::default(),
            resolver: Box::new(resolver),
            validators: default_validators(),
            include_imports: false,
            strict_names: false,
        }
    }

    /// Sets whether [`files`](Compiler::files) also returns imported files.
    ///
    /// By default, only files explicitly opened with [`open_file`](Compiler::open_file) are
    /// returned.
    pub fn include_imports(&mut self, yes: bool) -> &mut Self {
        self.include_imports = yes;
        self
    }

    /// Sets whether declaring a name twice is an error.
    ///
    /// By default the later declaration replaces the earlier one, and the conflict is logged and
    /// recorded in [`ProtoContext::conflicts`].
    pub fn strict_names(&mut self, yes: bool) -> &mut Self {
        self.strict_names = yes;
        self
    }

    /// Adds a validator, run after the built-in ones on every file loaded from now on.
    pub fn add_validator<V>(&mut self, validator: V) -> &mut Self
    where
        V: Validator + 'static,
    {
        self.validators.push(Box::new(validator));
        self
    }

    /// Loads the file at the given path, along with its imports.
    ///
    /// If the path is absolute, or relative to the current directory, it must reside under one
    /// of the include paths. Otherwise, it is looked up relative to the include paths in the same
    /// way as `import` statements.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, Error> {
        let path = path.as_ref();
        let (name, is_resolved) = if let Some(name) = self.resolver.resolve_path(path) {
            (name, true)
        } else if let Some(name) = path_to_file_name(path) {
            (name, false)
        } else {
            return Err(Error::from_kind(ErrorKind::FileNotIncluded {
                path: path.to_owned(),
            }));
        };

        if let Some(&id) = self.module.names.get(&name) {
            let ctx = &mut self.module.contexts[id.index()];
            if is_resolved {
                check_shadow(&name, ctx.path(), path)?;
            }
            ctx.is_root = true;
            return Ok(self);
        }

        let file = self.resolver.open_file(&name).map_err(|err| {
            if err.is_file_not_found() {
                Error::from_kind(ErrorKind::FileNotIncluded {
                    path: path.to_owned(),
                })
            } else {
                err
            }
        })?;
        if is_resolved {
            check_shadow(&name, file.path(), path)?;
        }

        let mut import_stack = vec![name];
        self.add_imports(&file, &mut import_stack)?;
        drop(import_stack);

        self.add_file(file, true)?;
        Ok(self)
    }

    /// Loads several files with [`open_file`](Compiler::open_file).
    pub fn open_files(
        &mut self,
        paths: impl IntoIterator<Item = impl AsRef<Path>>,
    ) -> Result<&mut Self, Error> {
        for path in paths {
            self.open_file(path)?;
        }

        Ok(self)
    }

    /// The files opened so far, plus their imports if
    /// [`include_imports`](Compiler::include_imports) is set.
    ///
    /// Imported files come before the files importing them.
    pub fn files(&self) -> impl Iterator<Item = &Proto> + '_ {
        self.module
            .contexts
            .iter()
            .filter(move |ctx| self.include_imports || ctx.is_root)
            .map(ProtoContext::proto)
    }

    /// Every file loaded so far, including imports.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Consumes the compiler, returning every file loaded so far.
    pub fn into_module(self) -> Module {
        self.module
    }

    fn add_imports(&mut self, file: &File, import_stack: &mut Vec<String>) -> Result<(), Error> {
        for import in &file.ast.imports {
            self.add_import(&import.value, import_stack)
                .map_err(|err| {
                    err.into_import_error(&file.name, &file.source, import.value_span.clone())
                })?;
        }
        Ok(())
    }

    fn add_import(&mut self, file_name: &str, import_stack: &mut Vec<String>) -> Result<(), Error> {
        if import_stack.iter().any(|name| name == file_name) {
            let mut cycle = String::new();
            for import in import_stack.iter() {
                let _ = write!(&mut cycle, "{} -> ", import);
            }
            cycle.push_str(file_name);

            return Err(Error::from_kind(ErrorKind::CircularImport {
                name: file_name.to_owned(),
                cycle,
            }));
        }

        if self.module.names.contains_key(file_name) {
            return Ok(());
        }

        let file = self.resolver.open_file(file_name)?;

        import_stack.push(file_name.to_owned());
        self.add_imports(&file, import_stack)?;
        import_stack.pop();

        self.add_file(file, false)
    }

    fn add_file(&mut self, file: File, is_root: bool) -> Result<(), Error> {
        let File {
            name,
            path,
            source,
            ast,
        } = file;

        let id = FileId::new(self.module.contexts.len());
        let mut proto = build_proto(id, &name, &source, &ast);

        let mut imports = Imports::default();
        for import in &mut proto.imports {
            let import_id = *self
                .module
                .names
                .get(&import.name)
                .expect("imports are loaded before the files importing them");
            import.file = Some(import_id);
            if import.kind.is_public() {
                imports.public.push(import_id);
            } else {
                imports.private.push(import_id);
            }
        }

        let mut ctx = ProtoContext::new(proto, path, source);
        ctx.imports = imports;
        ctx.is_root = is_root;

        self.module.contexts.push(ctx);
        self.module.names.insert(name.clone(), id);

        if let Err(err) = self.initialize(id) {
            tracing::debug!(file = %name, error = %err, "failed to load file");
            self.module.contexts.pop();
            self.module.names.remove(&name);
            return Err(err);
        }

        let proto = &self.module[id];
        tracing::debug!(
            file = %name,
            id = id.index(),
            messages = proto.message_arena.len(),
            enums = proto.enum_arena.len(),
            services = proto.service_arena.len(),
            extensions = proto.extension_arena.len(),
            "loaded file"
        );
        Ok(())
    }

    fn initialize(&mut self, id: FileId) -> Result<(), Error> {
        {
            let (ctx, loaded) = self
                .module
                .contexts
                .split_last_mut()
                .expect("file was just added");
            debug_assert_eq!(ctx.proto.id, id);

            register_types(ctx, loaded, self.strict_names).map_err(|err| check_error(ctx, err))?;
            resolve_types(ctx, loaded).map_err(|err| check_error(ctx, err))?;
            register_extensions(ctx, loaded);
        }

        for validator in &self.validators {
            validator.validate(&self.module, id)?;
        }

        self.module.contexts[id.index()].initialized = true;
        Ok(())
    }
}

/// Records each resolved extension under its extendee, and sets the namespace its fields are
/// named in.
fn register_extensions(ctx: &mut ProtoContext, loaded: &[ProtoContext]) {
    let file = ctx.proto.id;

    for index in 0..ctx.proto.extension_arena.len() {
        let extension = &ctx.proto.extension_arena[index];
        let namespace = match extension.parent {
            Parent::File(_) => ctx.proto.namespace(),
            Parent::Message(parent) => format!("{}.", ctx.proto[parent].full_name),
        };
        let extendee = extension
            .extendee
            .expect("extendees are resolved before extensions are registered");
        let extendee = message_full_name(ctx, loaded, extendee).to_owned();

        ctx.proto.extension_arena[index].namespace = namespace;
        ctx.extensions
            .register(&extendee, ExtensionId::new(file, index));
    }
}

fn message_full_name<'a>(
    ctx: &'a ProtoContext,
    loaded: &'a [ProtoContext],
    id: MessageId,
) -> &'a str {
    if id.file() == ctx.proto.id {
        &ctx.proto[id].full_name
    } else {
        &loaded[id.file().index()].proto[id].full_name
    }
}

fn check_error(ctx: &ProtoContext, err: CheckError) -> Error {
    Error::check(err, &ctx.proto.file_name, &ctx.source)
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("files", &self.module.names)
            .field("validators", &self.validators.len())
            .field("include_imports", &self.include_imports)
            .field("strict_names", &self.strict_names)
            .finish_non_exhaustive()
    }
}
