//! One archive, end to end: locate, walk both sections, cross-reference.

use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::bone::{extract_bones, Skeleton};
use crate::locator::{LocatedSections, LocatorConfig, PakSectionLocator, SectionRequest};
use crate::mesh::{extract_meshes, MeshOptions, MeshRecord};
use crate::{Error, Result};

/// Everything that steers one extraction run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PakOptions {
    pub sections: SectionRequest,
    pub locator: LocatorConfig,
    pub mesh: MeshOptions,
}

/// Meshes and skeleton of one archive.
#[derive(Debug)]
pub struct PakExtraction {
    pub sections: LocatedSections,
    /// Records after skip and reverse, in emission order.
    pub meshes: Vec<MeshRecord>,
    /// Records removed by skip.
    pub skipped: Vec<MeshRecord>,
    pub skeleton: Skeleton,
    /// Non-fatal problems from both sections and the cross-reference.
    pub issues: Vec<Error>,
}

impl PakExtraction {
    /// Bones referenced by skipped meshes and by no emitted mesh, ascending.
    pub fn bones_only_in_skipped(&self) -> Vec<usize> {
        let kept: FxHashSet<u32> = self
            .meshes
            .iter()
            .flat_map(|mesh| mesh.bone_indices.iter().copied())
            .collect();

        let mut only: Vec<usize> = self
            .skipped
            .iter()
            .flat_map(|mesh| mesh.bone_indices.iter().copied())
            .filter(|bone| !kept.contains(bone))
            .map(|bone| bone as usize)
            .filter(|&bone| bone < self.skeleton.len())
            .collect();
        only.sort_unstable();
        only.dedup();
        only
    }
}

/// Locate both sections and decode them.
///
/// Fails if either section cannot be located or its mandatory header cannot
/// be read. Everything below that level lands in [`PakExtraction::issues`].
pub fn extract_pak(data: &[u8], options: &PakOptions) -> Result<PakExtraction> {
    let sections = PakSectionLocator::new(data, options.locator).locate(&options.sections)?;

    let meshes = extract_meshes(data, &sections.mesh, &options.mesh)?;
    let bones = extract_bones(data, &sections.bone)?;

    let mut issues = meshes.issues;
    issues.extend(bones.issues);

    let bone_count = bones.skeleton.len();
    for mesh in &meshes.records {
        for &bone in &mesh.bone_indices {
            if bone as usize >= bone_count {
                let issue = Error::UnresolvedBone {
                    mesh: mesh.index,
                    bone,
                    bone_count,
                };
                warn!("{issue}");
                issues.push(issue);
            }
        }
    }

    debug!(
        "{} meshes ({} skipped), {} bones, {} issues",
        meshes.records.len(),
        meshes.skipped.len(),
        bone_count,
        issues.len()
    );

    Ok(PakExtraction {
        sections,
        meshes: meshes.records,
        skipped: meshes.skipped,
        skeleton: bones.skeleton,
        issues,
    })
}
