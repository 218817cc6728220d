//! Like and bookmark command handlers

use anyhow::{bail, Result};

use feedsync_core::{AnnotationKind, ContentSource, FeedSession};

use crate::output::Output;

/// Toggle `kind` on the article named by `target`
///
/// `target` is either a 1-based position in the unfiltered listing or an
/// article id.
pub async fn toggle<S: ContentSource>(
    session: &mut FeedSession<S>,
    kind: AnnotationKind,
    target: &str,
    output: &Output,
) -> Result<()> {
    session.hydrate().await;
    let id = resolve_target(session, target)?;

    if !session.contains(&id) {
        output.warn(&format!("'{}' is not in the local feed", id));
    }

    let now = match kind {
        AnnotationKind::Liked => session.toggle_like(&id),
        AnnotationKind::Bookmarked => session.toggle_bookmark(&id),
    };

    let verb = if now { "Added to" } else { "Removed from" };
    output.success(&format!("{} {}: {}", verb, kind, id));
    if let Some(view) = session.view(&id) {
        output.print_item(&view);
    }
    Ok(())
}

fn resolve_target<S: ContentSource>(session: &FeedSession<S>, target: &str) -> Result<String> {
    let target = target.trim();
    if target.is_empty() {
        bail!("Article id or position required");
    }

    match target.parse::<usize>() {
        Ok(position) => match session.id_at(position) {
            Some(id) => Ok(id),
            None => bail!(
                "No article at position {}. Run `feedsync list` to see positions.",
                position
            ),
        },
        Err(_) => Ok(target.to_string()),
    }
}
