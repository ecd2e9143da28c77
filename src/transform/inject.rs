//! Injection of namespaced support classes
//!
//! The crate embeds a gzip-compressed tarball of precompiled support classes
//! (the `PlatformMethods` resolver and its helpers) living under a placeholder
//! package. Each build copies them into its own namespace so that artifacts
//! built separately never share a resolver on the runtime classpath.

use std::io::Read;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::codegen::class::ClassFile;
use crate::codegen::reader::read_class;
use crate::codegen::writer::ClassfileWritable;
use crate::common::error::{Error, Result};
use crate::common::identifier::BuildIdentifier;
use crate::common::output::OutputInterface;
use crate::consts::{CLASS_FILE_SUFFIX, INJECTABLES_PLACEHOLDER};

use super::remap::{remap_class, PrefixRemapper};

/// Support classes rooted at `me/shedaniel/architect/plugin/callsite/`
pub static EMBEDDED_ARCHIVE: &[u8] = include_bytes!("../../resources/injection.tar.gz");

/// `<identifier>/<SimpleName>` for a class entry, `None` for anything else
pub fn new_class_name(entry: &str, identifier: &BuildIdentifier) -> Option<String> {
    let stem = entry.strip_suffix(CLASS_FILE_SUFFIX)?;
    let simple = stem.rsplit('/').next().filter(|s| !s.is_empty())?;
    Some(format!("{}/{}", identifier, simple))
}

/// Move a support class out of the placeholder package and give it `new_name`
pub fn rename_support_class(bytes: &[u8], new_name: &str, identifier: &BuildIdentifier) -> Result<Vec<u8>> {
    let mut class: ClassFile = read_class(bytes)?;
    remap_class(&mut class, &PrefixRemapper::new(INJECTABLES_PLACEHOLDER, identifier.as_str()))?;
    class.set_name(new_name)?;
    Ok(class.to_classfile_bytes()?)
}

/// Rename every class in the gzip tarball `archive` into `identifier` and add
/// it to `output`. Returns the new names in archive order.
pub fn inject_support_classes<R: Read>(
    archive: R,
    identifier: &BuildIdentifier,
    output: &mut dyn OutputInterface,
) -> Result<Vec<String>> {
    let mut injected = Vec::new();
    for_each_class(archive, |entry_name, bytes| {
        let Some(new_name) = new_class_name(entry_name, identifier) else {
            return Ok(());
        };
        let renamed = rename_support_class(&bytes, &new_name, identifier)?;
        output
            .add_class(&new_name, renamed)
            .map_err(|source| Error::Output { name: new_name.clone(), source })?;
        log::debug!("injected {} as {}", entry_name, new_name);
        injected.push(new_name);
        Ok(())
    })?;
    log::info!("injected {} support classes into {}", injected.len(), identifier);
    Ok(injected)
}

/// Entry names of the classes in the embedded archive
pub fn list_support_classes() -> Result<Vec<String>> {
    let mut names = Vec::new();
    for_each_class(EMBEDDED_ARCHIVE, |entry_name, _| {
        names.push(entry_name.to_string());
        Ok(())
    })?;
    Ok(names)
}

/// Visit each regular `.class` file of a gzip tarball with its contents
fn for_each_class<R, F>(archive: R, mut visit: F) -> Result<()>
where
    R: Read,
    F: FnMut(&str, Vec<u8>) -> Result<()>,
{
    let mut archive = Archive::new(GzDecoder::new(archive));
    let entries = archive
        .entries()
        .map_err(|e| Error::archive_error(format!("failed to read archive: {}", e)))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::archive_error(format!("failed to read entry: {}", e)))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| Error::archive_error(format!("bad entry path: {}", e)))?
            .to_string_lossy()
            .replace('\\', "/");
        if !name.ends_with(CLASS_FILE_SUFFIX) {
            continue;
        }
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| Error::archive_error(format!("failed to read {}: {}", name, e)))?;
        visit(&name, bytes)?;
    }
    Ok(())
}
