//! The mark engine: drives the triset to its fixed point.

use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{GcError, LinkError, Result};
use crate::store::LinkService;
use crate::triset::Triset;

/// Pop gray keys and gray their link targets until no gray keys remain.
///
/// Keys grayed under a strict root fail the run on any link-service
/// error. Under a best-effort root a locally-missing block reads as
/// having no links; every other error is still fatal. Link targets
/// inherit the strictness of the key they were discovered through.
pub async fn mark_to_fixed_point(
    set: &mut Triset,
    links: &dyn LinkService,
    cancel: &CancelToken,
) -> Result<()> {
    let mut visited: u64 = 0;
    loop {
        if cancel.is_canceled() {
            return Err(GcError::Canceled);
        }
        let Some((cid, strict)) = set.pop_gray() else {
            break;
        };

        let targets = match links.get_links(cancel, &cid).await {
            Ok(targets) => targets,
            Err(LinkError::NotFound(_)) if !strict => Vec::new(),
            Err(err) => return Err(GcError::fetch_links(cid, err)),
        };
        for target in targets {
            set.insert_gray(&target, strict);
        }
        visited += 1;
    }
    debug!(visited, "mark reached fixed point");
    Ok(())
}
