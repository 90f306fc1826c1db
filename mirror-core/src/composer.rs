use std::fmt::Write;

use crate::config::FooterSettings;
use crate::dispatch::{media_id, DomainDispatcher};
use crate::types::{MirrorService, MirroredRecord};

const COMMENT_INTRO: &str = "\nMirrored links\n------\n";

#[derive(Debug, Clone)]
pub struct CommentComposer {
    footer: String,
    dispatcher: DomainDispatcher,
}

impl CommentComposer {
    pub fn new(footer: &FooterSettings, dispatcher: DomainDispatcher) -> Self {
        Self {
            footer: render_footer(footer),
            dispatcher,
        }
    }

    /// Renders the full comment. Output depends only on the record's fields.
    pub fn compose(&self, record: &MirroredRecord) -> String {
        let mut body = String::from(COMMENT_INTRO);
        body.push('\n');

        if let Some(source) = self.dispatcher.audio_source(&record.original_domain) {
            body.push_str(&audio_warning(source));
        }
        let _ = write!(body, "* [Original]({})", record.original_url);

        for (service, url) in record.populated() {
            body.push_str("\n\n");
            body.push_str(&mirror_block(service, url, record));
        }

        body.push('\n');
        body.push_str(&self.footer);
        body
    }
}

fn audio_warning(source: &str) -> String {
    format!(
        "*NOTE: The original url was a {source}, which has audio. \
         Gfycat removes audio, but the others should be fine*\n\n"
    )
}

fn mirror_block(service: MirrorService, url: &str, record: &MirroredRecord) -> String {
    let id = media_id(url).unwrap_or_default();
    match service {
        MirrorService::Gfycat => {
            let giant = |ext: &str| format!("https://giant.gfycat.com/{id}.{ext}");
            format!(
                "* [Gfycat]({url}) | [mp4]({}) - [webm]({}) - [gif]({})",
                giant("mp4"),
                giant("webm"),
                giant("gif")
            )
        }
        MirrorService::Mediacrush => {
            let cdn = |ext: &str| format!("https://cdn.mediacru.sh/{id}.{ext}");
            let mut block = format!(
                "* [Mediacrush]({url}) | [mp4]({}) - [webm]({})",
                cdn("mp4"),
                cdn("webm")
            );
            // Gfycat sources are already gifs.
            if !record.original_url.contains("gfycat") {
                let _ = write!(block, " - [gif]({})", cdn("gif"));
            }
            let _ = write!(block, " - [ogg]({})", cdn("ogv"));
            block
        }
        MirrorService::Offsided => format!("* [Offsided]({url})"),
        MirrorService::Imgur => format!("* [Imgur]({url}) (gif only)"),
        MirrorService::Streamable => format!("* [Streamable]({url})"),
    }
}

fn render_footer(footer: &FooterSettings) -> String {
    format!(
        "\n\n------\n\
         [^Source ^Code]({source}) ^|\n\
         [^Feedback/Bugs?](http://www.reddit.com/message/compose?to={maintainer}&subject={subject}) \
         ^| ^By ^/[u/{maintainer}](http://reddit.com/u/{maintainer})\n",
        source = footer.source_url,
        maintainer = footer.maintainer,
        subject = footer.feedback_subject,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RedditPost;

    fn record(domain: &str, url: &str) -> MirroredRecord {
        MirroredRecord::new(&RedditPost {
            id: "abc1".to_string(),
            title: "Goal".to_string(),
            subreddit: "soccer".to_string(),
            url: url.to_string(),
            domain: domain.to_string(),
            permalink: String::new(),
            created_utc: 0,
        })
    }

    fn composer() -> CommentComposer {
        CommentComposer::new(&FooterSettings::default(), DomainDispatcher::default())
    }

    #[test]
    fn test_full_vine_comment() {
        let mut record = record("vine.co", "https://vine.co/v/xyz");
        record.set(MirrorService::Gfycat, "http://gfycat.com/BigGoal");
        record.set(MirrorService::Mediacrush, "https://mediacru.sh/Mc12");
        record.set(MirrorService::Offsided, "http://offsided.com/link/of1");

        let expected = "\nMirrored links\n------\n\n\
            *NOTE: The original url was a Vine, which has audio. Gfycat removes audio, but the others should be fine*\n\n\
            * [Original](https://vine.co/v/xyz)\n\n\
            * [Gfycat](http://gfycat.com/BigGoal) | [mp4](https://giant.gfycat.com/BigGoal.mp4) - [webm](https://giant.gfycat.com/BigGoal.webm) - [gif](https://giant.gfycat.com/BigGoal.gif)\n\n\
            * [Mediacrush](https://mediacru.sh/Mc12) | [mp4](https://cdn.mediacru.sh/Mc12.mp4) - [webm](https://cdn.mediacru.sh/Mc12.webm) - [gif](https://cdn.mediacru.sh/Mc12.gif) - [ogg](https://cdn.mediacru.sh/Mc12.ogv)\n\n\
            * [Offsided](http://offsided.com/link/of1)\n\
            \n\n------\n\
            [^Source ^Code](https://github.com/hzsweers/gfy_mirror) ^|\n\
            [^Feedback/Bugs?](http://www.reddit.com/message/compose?to=pandanomic&subject=gfymirror) ^| ^By ^/[u/pandanomic](http://reddit.com/u/pandanomic)\n";

        assert_eq!(composer().compose(&record), expected);
    }

    #[test]
    fn test_no_mirrors_still_has_original_and_footer() {
        let record = record("i.imgur.com", "https://i.imgur.com/a.gif");
        let comment = composer().compose(&record);
        assert!(comment.contains("* [Original](https://i.imgur.com/a.gif)\n\n\n------\n"));
        assert!(!comment.contains("NOTE"));
    }

    #[test]
    fn test_mediacrush_omits_gif_for_gfycat_sources() {
        let mut record = record("gfycat.com", "http://gfycat.com/Name");
        record.set(MirrorService::Mediacrush, "https://mediacru.sh/Mc12");
        let comment = composer().compose(&record);
        assert!(comment.contains("[webm](https://cdn.mediacru.sh/Mc12.webm) - [ogg]"));
        assert!(!comment.contains("Mc12.gif"));
    }

    #[test]
    fn test_composition_is_order_stable() {
        let mut first = record("vine.co", "https://vine.co/v/xyz");
        first.set(MirrorService::Streamable, "https://streamable.com/s1");
        first.set(MirrorService::Imgur, "https://i.imgur.com/i1.gif");
        first.set(MirrorService::Gfycat, "http://gfycat.com/G");

        let mut second = record("vine.co", "https://vine.co/v/xyz");
        second.set(MirrorService::Gfycat, "http://gfycat.com/G");
        second.set(MirrorService::Imgur, "https://i.imgur.com/i1.gif");
        second.set(MirrorService::Streamable, "https://streamable.com/s1");

        let composer = composer();
        let rendered = composer.compose(&first);
        assert_eq!(rendered, composer.compose(&second));

        let gfy = rendered.find("[Gfycat]").unwrap();
        let imgur = rendered.find("[Imgur]").unwrap();
        let streamable = rendered.find("[Streamable]").unwrap();
        assert!(gfy < imgur && imgur < streamable);
    }
}
