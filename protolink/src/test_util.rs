use std::collections::HashMap;

use crate::{
    file::{File, FileResolver},
    Compiler, Error, Module,
};

/// Serves files from memory.
#[derive(Debug, Default)]
pub(crate) struct TestFileResolver {
    files: HashMap<String, String>,
}

impl TestFileResolver {
    pub fn new(files: &[(&str, &str)]) -> Self {
        TestFileResolver {
            files: files
                .iter()
                .map(|(name, source)| ((*name).to_owned(), (*source).to_owned()))
                .collect(),
        }
    }
}

impl FileResolver for TestFileResolver {
    fn open_file(&self, name: &str) -> Result<File, Error> {
        match self.files.get(name) {
            Some(source) => File::from_source(name, source),
            None => Err(Error::file_not_found(name)),
        }
    }
}

/// Compiles the last of `files`, which may import the others.
pub(crate) fn compile(files: &[(&str, &str)]) -> Result<Module, Error> {
    let root = files[files.len() - 1].0;
    let mut compiler = Compiler::with_file_resolver(TestFileResolver::new(files));
    compiler.open_file(root)?;
    Ok(compiler.into_module())
}
