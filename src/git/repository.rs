use std::collections::HashMap;
use std::path::{Path, PathBuf};

use git2::{Direction, ObjectType, Oid, Repository as Git2Repo, ResetType};

use crate::error::{Result, TaggerError};
use crate::git::Identity;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        if path.is_relative() {
            return Ok(path.to_path_buf());
        }
        let workdir = self
            .repo
            .workdir()
            .ok_or_else(|| TaggerError::commit("repository has no working tree"))?;
        let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        path.strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| {
                TaggerError::commit(format!(
                    "{} is outside the working tree {}",
                    path.display(),
                    workdir.display()
                ))
            })
    }

    fn commit_paths(&self, relative: &[PathBuf], message: &str) -> std::result::Result<String, git2::Error> {
        let mut index = self.repo.index()?;
        for path in relative {
            index.add_path(path)?;
        }
        index.write()?;

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let signature = self.repo.signature()?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e),
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(oid.to_string())
    }

    fn unstage(&self, relative: &[PathBuf]) -> Result<()> {
        let head = match self.head_commit_oid()? {
            Some(oid) => Some(self.repo.find_object(oid, None)?),
            None => None,
        };
        self.repo
            .reset_default(head.as_ref(), relative.iter().map(PathBuf::as_path))?;
        Ok(())
    }

    fn head_commit_oid(&self) -> Result<Option<Oid>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn tag_target(&self, name: &str) -> Result<Option<Oid>> {
        match self.repo.find_reference(&format!("refs/tags/{}", name)) {
            Ok(reference) => Ok(Some(reference.peel(ObjectType::Commit)?.id())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn remote_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }
        }
        git2::Cred::default()
    });
    callbacks
}

impl super::Repository for Git2Repository {
    fn workdir(&self) -> Option<PathBuf> {
        self.repo.workdir().map(Path::to_path_buf)
    }

    fn commit(&self, paths: &[PathBuf], message: &str) -> Result<String> {
        let relative: Vec<PathBuf> = paths
            .iter()
            .map(|p| self.relative_path(p))
            .collect::<Result<_>>()?;

        self.commit_paths(&relative, message).map_err(|e| {
            // Leave the index as it was before staging
            if let Err(unstage) = self.unstage(&relative) {
                log::warn!("cannot unstage after failed commit: {}", unstage);
            }
            TaggerError::commit(e.message().to_string())
        })
    }

    fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        let tag_err = |e: git2::Error| TaggerError::tag_creation(e.message().to_string());

        let head = self
            .repo
            .head()
            .and_then(|h| h.peel(ObjectType::Commit))
            .map_err(tag_err)?;
        let signature = self.repo.signature().map_err(tag_err)?;

        self.repo
            .tag(name, &head, &signature, message, false)
            .map_err(tag_err)?;
        Ok(())
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.repo.tag_delete(name)?;
        Ok(())
    }

    fn revert_commit(&self, paths: &[PathBuf]) -> Result<()> {
        let head = self
            .head_commit_oid()?
            .ok_or_else(|| TaggerError::Rollback("no commit to revert".to_string()))?;
        let commit = self.repo.find_commit(head)?;

        let relative: Vec<PathBuf> = paths
            .iter()
            .map(|p| self.relative_path(p))
            .collect::<Result<_>>()?;

        match commit.parent(0) {
            Ok(parent) => {
                self.repo.reset(parent.as_object(), ResetType::Soft, None)?;
                if !relative.is_empty() {
                    self.repo.reset_default(
                        Some(parent.as_object()),
                        relative.iter().map(PathBuf::as_path),
                    )?;
                }
            }
            Err(_) => {
                // Root commit: return the branch to its unborn state
                let head_ref = self.repo.find_reference("HEAD")?;
                let branch = head_ref
                    .symbolic_target()
                    .ok_or_else(|| TaggerError::Rollback("HEAD is detached".to_string()))?
                    .to_string();
                self.repo.find_reference(&branch)?.delete()?;
                if !relative.is_empty() {
                    self.unstage(&relative)?;
                }
            }
        }
        Ok(())
    }

    fn checkout_paths(&self, paths: &[PathBuf]) -> Result<()> {
        let mut checkout = git2::build::CheckoutBuilder::new();
        // Files absent from HEAD are removed rather than left behind untracked
        checkout.force().remove_untracked(true);
        for path in paths {
            checkout.path(self.relative_path(path)?);
        }
        self.repo.checkout_head(Some(&mut checkout))?;
        Ok(())
    }

    fn tag_exists_locally(&self, name: &str) -> Result<bool> {
        Ok(self.tag_target(name)?.is_some())
    }

    fn tag_exists_remotely(&self, remote: &str, name: &str) -> Result<bool> {
        let mut remote = match self.repo.find_remote(remote) {
            Ok(remote) => remote,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                log::warn!("remote '{}' not configured, skipping remote tag check", remote);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let connection = remote.connect_auth(Direction::Fetch, Some(remote_callbacks()), None)?;
        let wanted = format!("refs/tags/{}", name);
        let peeled = format!("{}^{{}}", wanted);
        let found = connection
            .list()?
            .iter()
            .any(|head| head.name() == wanted || head.name() == peeled);
        Ok(found)
    }

    fn head_points_to_tag(&self, name: &str) -> Result<bool> {
        match (self.tag_target(name)?, self.head_commit_oid()?) {
            (Some(tag), Some(head)) => Ok(tag == head),
            _ => Ok(false),
        }
    }

    fn head_id(&self) -> Result<Option<String>> {
        Ok(self.head_commit_oid()?.map(|oid| oid.to_string()))
    }

    fn current_branch(&self) -> Result<Option<String>> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                let head_ref = self.repo.find_reference("HEAD")?;
                Ok(head_ref
                    .symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .map(str::to_string))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn latest_tag_with_prefix(&self, prefix: &str) -> Result<Option<String>> {
        let Some(head) = self.head_commit_oid()? else {
            return Ok(None);
        };

        // Commit id -> tag names, handling both lightweight and annotated tags
        let mut tag_oids: HashMap<Oid, Vec<String>> = HashMap::new();
        let tags = self.repo.tag_names(Some(&format!("{}*", prefix)))?;
        for tag_name in tags.iter().flatten() {
            if let Some(oid) = self.tag_target(tag_name)? {
                tag_oids.entry(oid).or_default().push(tag_name.to_string());
            }
        }
        if tag_oids.is_empty() {
            return Ok(None);
        }

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push(head)?;

        for oid in revwalk {
            if let Some(names) = tag_oids.get_mut(&oid?) {
                names.sort();
                return Ok(names.pop());
            }
        }
        Ok(None)
    }

    fn commit_subjects_since(&self, since: Option<&str>) -> Result<Vec<String>> {
        let Some(head) = self.head_commit_oid()? else {
            return Ok(Vec::new());
        };

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push(head)?;
        if let Some(tag) = since {
            if let Some(oid) = self.tag_target(tag)? {
                revwalk.hide(oid)?;
            }
        }

        let mut subjects = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            if commit.parent_count() > 1 {
                continue;
            }
            if let Some(summary) = commit.summary() {
                subjects.push(summary.to_string());
            }
        }
        Ok(subjects)
    }

    fn identity(&self) -> Result<Identity> {
        let signature = self.repo.signature()?;
        Ok(Identity {
            name: signature.name().unwrap_or("unknown").to_string(),
            email: signature.email().unwrap_or("unknown").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Repository;
    use std::fs;
    use tempfile::TempDir;

    fn init() -> (TempDir, Git2Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Git2Repo::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        (dir, Git2Repository::from_git2(repo))
    }

    fn commit_file(dir: &TempDir, repo: &Git2Repository, name: &str, content: &str, msg: &str) {
        fs::write(dir.path().join(name), content).unwrap();
        repo.commit(&[PathBuf::from(name)], msg).unwrap();
    }

    #[test]
    fn test_commit_tag_and_lookup() {
        let (dir, repo) = init();
        commit_file(&dir, &repo, "pkg.spec", "v1", "Initial commit");

        assert!(!repo.tag_exists_locally("pkg-1.0").unwrap());
        repo.create_tag("pkg-1.0", "Tagging package pkg-1.0").unwrap();
        assert!(repo.tag_exists_locally("pkg-1.0").unwrap());
        assert!(repo.head_points_to_tag("pkg-1.0").unwrap());

        commit_file(&dir, &repo, "pkg.spec", "v2", "feat: second");
        assert!(!repo.head_points_to_tag("pkg-1.0").unwrap());
        assert_eq!(
            repo.latest_tag_with_prefix("pkg-").unwrap(),
            Some("pkg-1.0".to_string())
        );
        assert_eq!(
            repo.commit_subjects_since(Some("pkg-1.0")).unwrap(),
            vec!["feat: second".to_string()]
        );
    }

    #[test]
    fn test_duplicate_tag_is_tag_creation_error() {
        let (dir, repo) = init();
        commit_file(&dir, &repo, "pkg.spec", "v1", "Initial commit");
        repo.create_tag("pkg-1.0", "first").unwrap();

        let err = repo.create_tag("pkg-1.0", "again").unwrap_err();
        assert!(matches!(err, TaggerError::TagCreation(_)));
    }

    #[test]
    fn test_revert_commit_restores_head() {
        let (dir, repo) = init();
        commit_file(&dir, &repo, "pkg.spec", "v1", "Initial commit");
        let before = repo.head_id().unwrap();

        commit_file(&dir, &repo, "pkg.spec", "v2", "Bump");
        repo.revert_commit(&[PathBuf::from("pkg.spec")]).unwrap();

        assert_eq!(repo.head_id().unwrap(), before);
    }

    #[test]
    fn test_checkout_paths_discards_edits() {
        let (dir, repo) = init();
        commit_file(&dir, &repo, "pkg.spec", "v1", "Initial commit");
        fs::write(dir.path().join("pkg.spec"), "edited").unwrap();

        repo.checkout_paths(&[PathBuf::from("pkg.spec")]).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("pkg.spec")).unwrap(), "v1");
    }

    #[test]
    fn test_revert_root_commit_unborns_branch() {
        let (dir, repo) = init();
        commit_file(&dir, &repo, "pkg.spec", "v1", "Initial commit");

        repo.revert_commit(&[PathBuf::from("pkg.spec")]).unwrap();
        assert_eq!(repo.head_id().unwrap(), None);
    }

    #[test]
    fn test_missing_remote_counts_as_absent() {
        let (dir, repo) = init();
        commit_file(&dir, &repo, "pkg.spec", "v1", "Initial commit");
        assert!(!repo.tag_exists_remotely("origin", "pkg-1.0").unwrap());
    }

    #[test]
    fn test_identity() {
        let (_dir, repo) = init();
        let identity = repo.identity().unwrap();
        assert_eq!(identity.name, "Test User");
        assert_eq!(identity.email, "test@example.com");
    }
}
