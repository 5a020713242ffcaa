//! Built-in category labels and the default app-to-category map.
//!
//! Categories are organized by routing need: whether a service is blocked,
//! needs a proxy, or should go direct.

/// Built-in category labels selectable as routing targets.
pub const APP_GROUPS: &[&str] = &[
    "🤖 AI 服务",
    "📋 Google",
    "💬 社交媒体",
    "🎬 国际流媒体",
    "📰 国际媒体",
    "🛠 开发者工具",
    "🎮 游戏平台",
    "🍎 Apple",
    "Ⓜ️ Microsoft",
    "🖧 本地局域网",
    "🏠 国内直连",
];

/// Display label for apps with no category.
pub const UNCATEGORIZED_GROUP_LABEL: &str = "📦 未分类";
/// Stable key for the uncategorized sentinel bucket.
pub const UNCATEGORIZED_GROUP_KEY: &str = "__uncategorized__";

/// Policy group for LAN traffic; gets per-node choices instead of the
/// selector abstraction.
pub const LAN_GROUP: &str = "🖧 本地局域网";

/// Default category for a catalog app, if it has one.
pub fn default_group(app_name: &str) -> Option<&'static str> {
    let group = match app_name {
        // 🤖 AI 服务
        "OpenAI" | "Claude" | "Anthropic" | "Gemini" | "BardAI" | "Copilot" | "Perplexity"
        | "Midjourney" | "Civitai" | "HuggingFace" | "Replicate" | "Runway" | "StabilityAI"
        | "Poe" | "Character" | "Suno" => "🤖 AI 服务",

        // 📋 Google
        "Google" | "Gmail" | "GoogleDrive" | "GooglePlay" | "GoogleTranslate"
        | "GoogleScholar" | "GoogleAnalytics" | "YouTube" | "YouTubeMusic" | "Firebase"
        | "Android" | "Chromecast" | "GoogleVoice" | "GoogleEarth" | "GoogleSearch"
        | "Blogger" | "FeedBurner" => "📋 Google",

        // 💬 社交媒体
        "Telegram" | "Discord" | "Twitter" | "Facebook" | "Instagram" | "WhatsApp" | "Line"
        | "Signal" | "Snapchat" | "Reddit" | "Tumblr" | "Pinterest" | "LinkedIn"
        | "Mastodon" | "Threads" | "Messenger" | "Skype" | "Clubhouse" | "ClubhouseIP"
        | "Disqus" | "Flickr" | "Quora" | "Medium" | "Substack" | "Gravatar" | "Kakao"
        | "Viber" | "Zalo" | "4chan" | "Gettr" | "Truth" | "Parler" | "Gab" => "💬 社交媒体",

        // 🎬 国际流媒体
        "Netflix" | "Disney" | "DisneyPlus" | "Spotify" | "TikTok" | "Twitch" | "Hulu"
        | "HBO" | "HBOMax" | "AmazonPrimeVideo" | "AppleTV" | "AppleMusic" | "Peacock"
        | "Vimeo" | "DAZN" | "Pandora" | "SoundCloud" | "Deezer" | "Tidal" | "Niconico"
        | "AbemaTV" | "Abema" | "Bahamut" | "BritboxUK" | "All4" | "ATTWatchTV" | "CWSeed"
        | "Crunchyroll" | "DMM" | "Dailymotion" | "DiscoveryPlus" | "Emby" | "Funimation"
        | "Plex" | "Roku" | "Vudu" | "Starz" | "CableTV" | "CBS" | "ParamountPlus"
        | "BiliBiliIntl" => "🎬 国际流媒体",

        // 📰 国际媒体
        "BBC" | "CNN" | "Bloomberg" | "Reuters" | "NYTimes" | "WashingtonPost" | "Guardian"
        | "TheGuardian" | "WSJ" | "Economist" | "ABC" | "AP" | "AFP" | "ALJazeera"
        | "AppleDaily" | "AppleNews" | "Wikipedia" | "WikiMedia" | "BoXun" | "DW" | "FT"
        | "Forbes" | "HuffPost" | "NHK" | "NPR" | "Asahi" | "Dailymail" | "Vice" | "Vox"
        | "9News" | "9to5" | "AnandTech" | "Cnet" | "TheVerge" | "TechCrunch" | "Wired"
        | "ArsTechnica" | "Engadget" | "Mashable" | "Americasvoice" => "📰 国际媒体",

        // 🛠 开发者工具
        "GitHub" | "GitLab" | "Docker" | "StackOverflow" | "NPM" | "PyPI" | "JetBrains"
        | "DigitalOcean" | "Cloudflare" | "Vercel" | "Heroku" | "Netlify" | "AWS"
        | "Atlassian" | "Anaconda" | "Apifox" | "Electron" | "Developer" | "Collabora"
        | "Bootcss" | "Duckduckgo" | "Dropbox" | "Notion" | "Figma" | "Canva"
        | "Grammarly" | "1Password" | "LastPass" | "Bitwarden" | "Postman" => "🛠 开发者工具",

        // 🎮 游戏平台
        "Steam" | "Epic" | "PlayStation" | "Xbox" | "Nintendo" | "EA" | "Blizzard"
        | "Battle" | "Riot" | "Roblox" | "Ubisoft" | "Origin" | "GOG" | "Garena"
        | "2KGames" | "Rockstar" | "Supercell" | "miHoYo" | "HoYoverse" | "Nexon"
        | "Square" | "Bethesda" => "🎮 游戏平台",

        // 🍎 Apple
        "Apple" | "iCloud" | "AppStore" | "AppleID" | "AppleDev" | "AppleMail"
        | "AppleMedia" | "AppleProxy" | "AppleFirmware" | "AppleHardware" | "FaceTime"
        | "TestFlight" | "Beats" => "🍎 Apple",

        // Ⓜ️ Microsoft
        "Microsoft" | "OneDrive" | "Bing" | "Teams" | "Office365" | "Outlook" | "Azure" => {
            "Ⓜ️ Microsoft"
        }

        // 🖧 本地局域网
        "Lan" => "🖧 本地局域网",

        // 🏠 国内直连
        "WeChat" | "QQ" | "AliPay" | "Alibaba" | "AmazonCN" | "Baidu" | "BaiDuTieBa"
        | "BiliBili" | "ByteDance" | "DouYin" | "Douyu" | "iQIYI" | "Youku" | "AcFun"
        | "DingTalk" | "DouBan" | "Eleme" | "JD" | "MeiTuan" | "NetEase" | "NetEaseMusic"
        | "Sina" | "SinaWeibo" | "Weibo" | "Zhihu" | "XiaoHongShu" | "PinDuoDuo"
        | "Kuaishou" | "DiDi" | "CCTV" | "CSDN" | "Coolapk" | "Deepin" | "EastMoney"
        | "12306" | "360" | "36kr" | "4399" | "51Job" | "58TongCheng" | "Binance"
        | "Duolingo" => "🏠 国内直连",

        _ => return None,
    };
    Some(group)
}
