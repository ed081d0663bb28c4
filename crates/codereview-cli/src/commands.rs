//! Command handlers for CLI subcommands.

use std::path::Path;
use std::sync::Arc;

use codereview_core::{
    caching, CachingConfigurationLoader, ChangeEvent, RepositoryConfigurationLoader,
    ReviewContext, ReviewParameters, ReviewRequest, SecurityProvider, StaticSecurity,
    TrackerItems, WorkflowActionTag,
};
use codereview_models::{ItemRef, UserId};
use codereview_persistence::{RepositoryStore, TrackerStore};
use serde::Serialize;
use tracing::info;

use crate::cli::{Commands, OutputFormat, Subject};
use crate::error::CommandError;

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Role assignments file inside the state directory.
pub const SECURITY_FILE: &str = "security.json";

/// Stores and collaborators opened from a state directory.
pub struct Workspace {
    items: Arc<TrackerItems>,
    security: Arc<StaticSecurity>,
    loader: CachingConfigurationLoader<RepositoryConfigurationLoader>,
}

impl Workspace {
    /// Opens the state directory, acting as `user`.
    pub fn open(state_dir: &Path, user: Option<&str>) -> Result<Self> {
        let user = user.map(UserId::from);
        let security = Arc::new(StaticSecurity::load(
            &state_dir.join(SECURITY_FILE),
            user.clone(),
        )?);
        let repository = Arc::new(RepositoryStore::new(state_dir));
        let loader = caching(RepositoryConfigurationLoader::new(
            repository.clone(),
            repository,
            security.clone(),
        ));
        let items = Arc::new(TrackerItems::new(TrackerStore::new(state_dir), user));
        Ok(Self {
            items,
            security,
            loader,
        })
    }

    fn context(&self) -> ReviewContext {
        ReviewContext::new(
            self.items.clone(),
            self.items.clone(),
            self.security.clone(),
            self.items.clone(),
        )
    }

    /// Builds review parameters for `request`.
    pub fn parameters(&self, request: ReviewRequest) -> Result<ReviewParameters> {
        Ok(ReviewParameters::from_request(
            self.context(),
            request,
            &self.loader,
        )?)
    }
}

/// Execute a CLI command and print its output.
pub fn execute(command: Commands, state_dir: &Path, user: Option<&str>) -> Result<()> {
    let workspace = Workspace::open(state_dir, user)?;
    let output = run(&workspace, command)?;
    print!("{}", output);
    Ok(())
}

/// Execute a CLI command, returning its output.
pub fn run(workspace: &Workspace, command: Commands) -> Result<String> {
    match command {
        Commands::Status {
            subject,
            reviewer,
            path,
        } => cmd_status(workspace, &subject, reviewer.as_deref(), path.as_deref()),
        Commands::Revisions {
            subject,
            compare_all,
            format,
        } => cmd_revisions(workspace, &subject, compare_all, format),
        Commands::Link {
            subject,
            aggregated,
            compare_all,
            successful,
            params,
        } => cmd_link(workspace, &subject, aggregated, compare_all, successful, params),
        Commands::Complete {
            subject,
            revisions,
            reviewer,
            successful,
        } => cmd_complete(workspace, &subject, &revisions, reviewer.as_deref(), successful),
        Commands::History {
            subject,
            from,
            on,
            before,
        } => {
            let filter = match (from, on, before) {
                (Some(status), _, _) => HistoryFilter::LastFrom(status),
                (None, Some(date), _) => HistoryFilter::On(date),
                (None, None, Some(date)) => HistoryFilter::Before(date),
                (None, None, None) => HistoryFilter::All,
            };
            cmd_history(workspace, &subject, filter)
        }
    }
}

fn request(subject: &Subject) -> ReviewRequest {
    ReviewRequest::new(item_ref(subject))
}

fn item_ref(subject: &Subject) -> ItemRef {
    ItemRef::new(subject.project.as_str(), subject.item.as_str())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn cmd_status(
    workspace: &Workspace,
    subject: &Subject,
    reviewer: Option<&str>,
    path: Option<&str>,
) -> Result<String> {
    let item_ref = item_ref(subject);
    let item = workspace
        .items
        .store()
        .load_item(&item_ref.project_id, &item_ref.id)?;
    let params = workspace.parameters(request(subject))?;

    let mut out = String::new();
    out.push_str(&format!("{} ({})\n", item.title, item_ref));
    out.push_str(&format!("  Status: {}\n", item.status.as_deref().unwrap_or("-")));
    out.push_str(&format!("  Review state: {}\n", params.review_state()?));
    out.push_str(&format!("  In review status: {}\n", yes_no(params.is_in_review_status()?)));
    out.push_str(&format!("  Reviewer role: {}\n", yes_no(params.has_reviewer_role()?)));
    out.push_str(&format!("  Can review: {}\n", yes_no(params.can_review()?)));
    out.push_str(&format!(
        "  Workflow action configured: {}\n",
        yes_no(params.is_workflow_action_configured())
    ));
    if let Some(reviewer) = reviewer {
        let permitted = params.is_or_was_permitted_reviewer(Some(&UserId::from(reviewer)))?;
        out.push_str(&format!("  Permitted reviewer {}: {}\n", reviewer, yes_no(permitted)));
    }
    if let Some(path) = path {
        let permitted = params.is_location_permitted_for_fast_track(Some(path));
        out.push_str(&format!("  Fast track {}: {}\n", path, yes_no(permitted)));
    }
    Ok(out)
}

#[derive(Serialize)]
struct RevisionReport<'a> {
    subject: String,
    baseline: Option<i64>,
    reviewed: Option<&'a str>,
    pending: Vec<&'a str>,
    linked: &'a [codereview_models::Revision],
}

fn cmd_revisions(
    workspace: &Workspace,
    subject: &Subject,
    compare_all: bool,
    format: OutputFormat,
) -> Result<String> {
    let mut request = request(subject);
    request.compare_all = compare_all;
    let params = workspace.parameters(request)?;
    let revisions = params.create_revisions()?;

    let mut out = String::new();
    match format {
        OutputFormat::Table => {
            if revisions.linked().is_empty() {
                return Ok("No linked revisions.\n".to_string());
            }
            out.push_str(&format!("{:<12} {:<10} {:<16} MESSAGE\n", "REVISION", "STATE", "AUTHOR"));
            for revision in revisions.linked() {
                let state = if revisions.is_reviewed(revision) {
                    "reviewed"
                } else {
                    "pending"
                };
                out.push_str(&format!(
                    "{:<12} {:<10} {:<16} {}\n",
                    revision.name,
                    state,
                    revision.author.as_deref().unwrap_or("-"),
                    revision.message.as_deref().unwrap_or("")
                ));
            }
        }
        OutputFormat::Json => {
            let report = RevisionReport {
                subject: params.subject().to_string(),
                baseline: revisions.baseline(),
                reviewed: revisions.raw(),
                pending: revisions.pending().iter().map(|r| r.name.as_str()).collect(),
                linked: revisions.linked(),
            };
            out = serde_json::to_string_pretty(&report)?;
            out.push('\n');
        }
        OutputFormat::Brief => {
            for revision in revisions.pending() {
                out.push_str(&format!("{}\n", revision.name));
            }
        }
    }
    Ok(out)
}

fn cmd_link(
    workspace: &Workspace,
    subject: &Subject,
    aggregated: bool,
    compare_all: bool,
    successful: bool,
    extra: Vec<(String, String)>,
) -> Result<String> {
    let mut request = request(subject);
    request.aggregated_compare = aggregated;
    request.compare_all = compare_all;
    request.workflow_action = successful.then_some(WorkflowActionTag::SuccessfulReview);
    let params = workspace.parameters(request)?;

    let link = extra
        .into_iter()
        .fold(params.link(), |link, (name, value)| {
            link.with_additional_parameter(name, value)
        });
    Ok(format!("{}\n", link))
}

fn cmd_complete(
    workspace: &Workspace,
    subject: &Subject,
    reviewed: &[String],
    reviewer: Option<&str>,
    successful: bool,
) -> Result<String> {
    let mut request = request(subject);
    request.workflow_action = successful.then_some(WorkflowActionTag::SuccessfulReview);
    let params = workspace.parameters(request)?;

    if !params.can_review()? {
        let user = params.identity_for_current_user();
        return Err(CommandError::NotPermitted(format!(
            "{} may not review {} ({})",
            user.id.as_ref().map_or("anonymous", |id| id.as_str()),
            params.subject(),
            params.review_state()?
        )));
    }

    let revisions = params.create_revisions()?;
    let marked = if reviewed.is_empty() {
        revisions.mark_reviewed(revisions.pending().into_iter().map(|r| r.name.as_str()))
    } else {
        revisions.mark_reviewed(reviewed.iter().map(String::as_str))
    };

    let configuration = params.configuration();
    let new_reviewed = configuration
        .reviewed_revisions_field()
        .map(|_| marked.as_str());
    let current = workspace.security.current_user();
    let new_reviewer = reviewer.or_else(|| {
        configuration
            .reviewer_field()
            .and(current.as_ref().map(UserId::as_str))
    });

    params.store_work_item(new_reviewed, new_reviewer, true)?;
    info!(
        subject = %params.subject(),
        reviewed = %marked,
        reviewer = ?new_reviewer,
        "recorded review"
    );

    let mut out = String::new();
    out.push_str(&format!("Recorded review of {}\n", params.subject()));
    out.push_str(&format!("  Reviewed: {}\n", if marked.is_empty() { "-" } else { marked.as_str() }));
    if let Some(reviewer) = new_reviewer {
        let identity = params.identity_for_user(Some(&UserId::from(reviewer)));
        out.push_str(&format!(
            "  Reviewer: {}\n",
            identity.name.as_deref().unwrap_or(reviewer)
        ));
    }
    out.push_str(&format!("  Review state: {}\n", params.review_state()?));
    Ok(out)
}

/// Which change events `history` prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryFilter {
    All,
    LastFrom(String),
    On(chrono::NaiveDate),
    Before(chrono::NaiveDate),
}

fn cmd_history(workspace: &Workspace, subject: &Subject, filter: HistoryFilter) -> Result<String> {
    let history = workspace.items.history(&item_ref(subject))?;

    let events: Vec<&ChangeEvent> = match &filter {
        HistoryFilter::All => history.events().iter().collect(),
        HistoryFilter::LastFrom(status) => history
            .last_change_from(Some(status.as_str()))
            .into_iter()
            .collect(),
        HistoryFilter::On(date) => history.changes_on(*date),
        HistoryFilter::Before(date) => history.changes_before(*date),
    };

    if events.is_empty() {
        return Ok("No matching changes.\n".to_string());
    }
    let mut out = String::new();
    for event in events {
        out.push_str(&format!("{}\n", event.describe()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codereview_core::CONFIG_PATH;
    use codereview_models::{
        ProjectId, Revision, TrackedItem, TrackerSchema, WorkflowTransition, RESOLUTION_FIELD,
    };
    use tempfile::tempdir;

    const CONFIG: &str = "\
fastTrackPermittedLocationPattern=/trunk/doc/.*
reviewedRevisionsField=reviewedRevisions
reviewerField=reviewer
inReviewStatus=inReview
successfulReviewWorkflowAction=approve
successfulReviewResolution=done
reviewerRole=reviewers
";

    fn seed(dir: &Path) {
        let project = ProjectId::from("elibrary");
        let repository = RepositoryStore::new(dir);
        repository
            .write(
                &format!("{}/{}", repository.project_location(&project), CONFIG_PATH),
                CONFIG.as_bytes(),
            )
            .unwrap();

        let tracker = TrackerStore::new(dir);
        tracker
            .save_schema(
                &project,
                &TrackerSchema {
                    transitions: vec![WorkflowTransition::new("wf-approve", "approve", "closed")
                        .from_statuses(&["inReview"])
                        .requiring(RESOLUTION_FIELD)],
                    enumerations: Default::default(),
                },
            )
            .unwrap();
        let mut item = TrackedItem::new("elibrary", "EL-1", "Parser")
            .with_status("inReview")
            .with_revision(Revision::new("11"))
            .with_revision(Revision::new("12"));
        tracker.save_item(&mut item, None).unwrap();

        std::fs::write(
            dir.join(SECURITY_FILE),
            r#"{"projects": {"elibrary": {"alice": ["reviewers"]}}}"#,
        )
        .unwrap();
    }

    fn subject() -> Subject {
        Subject {
            project: "elibrary".to_string(),
            item: "EL-1".to_string(),
        }
    }

    #[test]
    fn test_status_reports_permissions() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let workspace = Workspace::open(dir.path(), Some("bob")).unwrap();

        let out = cmd_status(&workspace, &subject(), Some("alice"), Some("/trunk/src")).unwrap();
        assert!(out.contains("Can review: no"));
        assert!(out.contains("Permitted reviewer alice: yes"));
        assert!(out.contains("Fast track /trunk/src: no"));
    }

    #[test]
    fn test_revisions_brief() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let workspace = Workspace::open(dir.path(), Some("alice")).unwrap();

        let out = cmd_revisions(&workspace, &subject(), false, OutputFormat::Brief).unwrap();
        assert_eq!(out, "11\n12\n");

        let json = cmd_revisions(&workspace, &subject(), false, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pending"], serde_json::json!(["11", "12"]));
    }

    #[test]
    fn test_complete_records_review() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let workspace = Workspace::open(dir.path(), Some("alice")).unwrap();

        let out = cmd_complete(&workspace, &subject(), &[], None, true).unwrap();
        assert!(out.contains("Reviewed: 11,12"));
        assert!(out.contains("Review state: resolved"));

        let history = cmd_history(&workspace, &subject(), HistoryFilter::LastFrom("inReview".into()))
            .unwrap();
        assert!(history.contains("with status changed from inReview to closed"));
    }

    #[test]
    fn test_history_lists_one_line_per_event() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let workspace = Workspace::open(dir.path(), Some("alice")).unwrap();

        let out = cmd_history(&workspace, &subject(), HistoryFilter::All).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("1 ("));
        assert!(out.ends_with("by null with status changed from null to inReview\n"));

        let none = cmd_history(&workspace, &subject(), HistoryFilter::LastFrom("closed".into()))
            .unwrap();
        assert_eq!(none, "No matching changes.\n");
    }

    #[test]
    fn test_complete_requires_permission() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let workspace = Workspace::open(dir.path(), Some("bob")).unwrap();

        let result = cmd_complete(&workspace, &subject(), &[], None, true);
        assert!(matches!(result, Err(CommandError::NotPermitted(_))));
    }

    #[test]
    fn test_link_with_extra_parameters() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let workspace = Workspace::open(dir.path(), None).unwrap();

        let out = cmd_link(
            &workspace,
            &subject(),
            true,
            false,
            true,
            vec![("revision".to_string(), "12".to_string())],
        )
        .unwrap();
        assert_eq!(
            out,
            "/polarion/codereview?id=EL-1&projectId=elibrary&aggregated=true\
             &workflowAction=successfulReview&revision=12\n"
        );
    }
}
