//! One poll cycle: scan sources, filter, resolve, convert, compose, post, mark seen.

use mirror_core::{
    BotConfig, CommentComposer, CoreError, DomainDispatcher, ErrorExt, MediaResolver,
    MirrorConverter, MirroredRecord, PostFilter, RedditApiError, RedditGateway, RedditPost,
    Rejection,
};
use seen_store::SeenCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub subreddits: Vec<String>,
    pub fetch_limit: u32,
    /// Only applied when more than one subreddit is scanned.
    pub recent_window: Duration,
    pub comment_delay: Duration,
    pub dry_run: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &BotConfig, dry_run: bool) -> Self {
        Self {
            subreddits: config.sources.subreddits.clone(),
            fetch_limit: config.sources.fetch_limit,
            recent_window: Duration::from_secs(config.sources.recent_window_minutes * 60),
            comment_delay: config.polling.comment_delay(),
            dry_run,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Commented,
    /// Comment rendered but not sent.
    DryRun { comment: String },
    /// No media URL could be found; marked seen without a comment.
    ResolveFailed,
    /// Every converter failed; marked seen without a comment.
    NoMirrors,
    /// Posting failed; left unseen so the next cycle retries.
    PostFailed { rate_limited: bool },
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub scanned: usize,
    pub unsupported: usize,
    pub already_seen: usize,
    pub already_commented: usize,
    pub source_errors: usize,
    pub outcomes: Vec<(String, PostOutcome)>,
}

impl CycleReport {
    pub fn commented(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| {
                matches!(outcome, PostOutcome::Commented | PostOutcome::DryRun { .. })
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.commented()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} scanned, {} mirrored, {} failed, {} already handled",
            self.scanned,
            self.commented(),
            self.failed(),
            self.already_seen + self.already_commented
        )
    }
}

pub struct MirrorPipeline {
    reddit: Arc<dyn RedditGateway>,
    resolver: Arc<dyn MediaResolver>,
    converters: Vec<Arc<dyn MirrorConverter>>,
    filter: PostFilter,
    dispatcher: DomainDispatcher,
    composer: CommentComposer,
    settings: PipelineSettings,
}

impl MirrorPipeline {
    pub fn new(
        reddit: Arc<dyn RedditGateway>,
        resolver: Arc<dyn MediaResolver>,
        converters: Vec<Arc<dyn MirrorConverter>>,
        filter: PostFilter,
        composer: CommentComposer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            reddit,
            resolver,
            converters,
            filter,
            dispatcher: DomainDispatcher::default(),
            composer,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs one cycle. `now` is the current unix time in seconds.
    pub async fn run_cycle(&self, cache: &mut SeenCache, now: i64) -> CycleReport {
        let mut report = CycleReport::default();
        let mut candidates = Vec::new();

        for subreddit in &self.settings.subreddits {
            self.scan_source(subreddit, cache, now, &mut report, &mut candidates)
                .await;
        }

        // Oldest first across all sources
        candidates.sort_by_key(|post| post.created_utc);
        info!("{} posts to mirror this cycle", candidates.len());

        for post in candidates {
            // Crossposts of one clip share a URL
            if let Err(Rejection::AlreadySeen) = self.filter.precheck(&post, cache.seen()) {
                debug!("{} ({}) was handled earlier this cycle", post.id, post.url);
                report.already_seen += 1;
                continue;
            }
            let outcome = self.process_post(&post, cache).await;
            report.outcomes.push((post.id.clone(), outcome));
            if !self.settings.comment_delay.is_zero() {
                sleep(self.settings.comment_delay).await;
            }
        }

        report
    }

    async fn scan_source(
        &self,
        subreddit: &str,
        cache: &mut SeenCache,
        now: i64,
        report: &mut CycleReport,
        candidates: &mut Vec<RedditPost>,
    ) {
        let posts = match self
            .reddit
            .new_posts(subreddit, self.settings.fetch_limit)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                e.log_error();
                error!("Skipping r/{} this cycle", subreddit);
                report.source_errors += 1;
                return;
            }
        };
        debug!("r/{}: {} new posts", subreddit, posts.len());

        let windowed = self.settings.subreddits.len() > 1;
        let window_secs = self.settings.recent_window.as_secs() as i64;

        for post in posts {
            if windowed && now - post.created_utc > window_secs {
                continue;
            }
            report.scanned += 1;

            match self.filter.precheck(&post, cache.seen()) {
                Ok(()) => {}
                Err(Rejection::UnsupportedMedia) => {
                    debug!("{} ({}) is not supported media", post.id, post.url);
                    report.unsupported += 1;
                    mark_seen(cache, [post.id.clone()]).await;
                    continue;
                }
                Err(_) => {
                    report.already_seen += 1;
                    continue;
                }
            }

            let comments = match self.reddit.comments(&post.id).await {
                Ok(comments) => comments,
                Err(e) => {
                    e.log_warn();
                    warn!("Could not check comments on {}, skipping it", post.id);
                    continue;
                }
            };

            if self.filter.has_own_comment(&comments) {
                info!(
                    "Already commented on {}, done with r/{} for this cycle",
                    post.id, subreddit
                );
                report.already_commented += 1;
                mark_seen(cache, [post.id.clone()]).await;
                break;
            }

            candidates.push(post);
        }
    }

    pub async fn process_post(&self, post: &RedditPost, cache: &mut SeenCache) -> PostOutcome {
        info!("Mirroring {} \"{}\" ({})", post.id, post.title, post.url);

        let mut record = MirroredRecord::new(post);
        let plan = self.dispatcher.plan(post);
        if let Some((service, url)) = &plan.existing_mirror {
            debug!("{} is already on {}", post.id, service);
            record.set(*service, url.clone());
        }

        let media_url = match self.resolver.resolve(plan.strategy, &post.url).await {
            Ok(media_url) => media_url,
            Err(e) => {
                e.log_error();
                error!("Could not resolve media for {}, skipping it", post.id);
                mark_seen(cache, [post.id.clone(), post.url.clone()]).await;
                return PostOutcome::ResolveFailed;
            }
        };

        for converter in &self.converters {
            let service = converter.service();
            if plan.skips(service) {
                continue;
            }
            match converter.convert(&media_url, &post.title).await {
                Ok(mirror_url) => {
                    info!("{} mirror for {}: {}", service, post.id, mirror_url);
                    record.set(service, mirror_url);
                }
                Err(e) => {
                    e.log_warn();
                }
            }
        }

        if record.populated().next().is_none() {
            warn!("No mirror could be made for {}, not commenting", post.id);
            mark_seen(cache, [post.id.clone(), post.url.clone()]).await;
            return PostOutcome::NoMirrors;
        }

        let comment = self.composer.compose(&record);

        if self.settings.dry_run {
            info!("Dry run, comment for {}:\n{}", post.id, comment);
            mark_seen(cache, [post.id.clone(), post.url.clone()]).await;
            return PostOutcome::DryRun { comment };
        }

        match self.reddit.add_comment(&post.id, &comment).await {
            Ok(()) => {
                info!("Commented on {}", post.id);
                mark_seen(cache, [post.id.clone(), post.url.clone()]).await;
                PostOutcome::Commented
            }
            Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after })) => {
                warn!(
                    "Rate limited commenting on {} (retry after {}s), leaving it for next cycle",
                    post.id, retry_after
                );
                PostOutcome::PostFailed { rate_limited: true }
            }
            Err(e) => {
                e.log_error();
                error!("Failed to comment on {} ({})", post.id, post.permalink);
                PostOutcome::PostFailed {
                    rate_limited: false,
                }
            }
        }
    }
}

async fn mark_seen<const N: usize>(cache: &mut SeenCache, keys: [String; N]) {
    if let Err(e) = cache.insert_many(keys).await {
        e.log_warn();
    }
}
