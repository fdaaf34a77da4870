//! Static menu tree and canned texts.

pub const WELCOME: &str = "سلام کاربر عزیز به پشتیبانی سکو زیما خوش آمدید!\nلطفا موضوع درخواست خود را از گزینه های زیر انتخاب کنید";
pub const RETURN_TO_MENU: &str = "بازگشت به منوی اصلی";
pub const ASK_NATIONAL_ID: &str = "لطفا کد ملی خود را وارد کنید:";
pub const MESSAGE_RECEIVED: &str =
    "پیام شما دریافت شد. کارشناسان ما در اسرع وقت با شما تماس خواهند گرفت.";
pub const VIEW_TIMELINE: &str = "1. مشاهده زمان بندی واریز سود ها";

pub const NO_DATA_FOR_NATIONAL_ID: &str =
    "❌ اطلاعاتی برای این کد ملی یافت نشد. لطفا با پشتیبانی تماس بگیرید.";
pub const CONNECTION_ERROR: &str = "❌ خطا در اتصال به سرور. لطفا دوباره تلاش کنید.";
pub const NO_DATA_FOR_PLAN: &str = "❌ اطلاعاتی برای این طرح یافت نشد.";
pub const PLAN_FETCH_ERROR: &str = "❌ خطا در دریافت اطلاعات طرح. لطفا دوباره تلاش کنید.";
pub const NO_CACHED_PLANS: &str = "❌ اطلاعات زمان‌بندی سرمایه گذاری برای این طرح یافت نشد.";
pub const NO_TIMELINE: &str = "❌ اطلاعات زمان‌بندی برای این طرح یافت نشد.";
pub const TIMELINE_FETCH_ERROR: &str = "❌ خطا در دریافت اطلاعات زمان‌بندی. لطفا دوباره تلاش کنید.";
pub const TIMELINE_UNAVAILABLE: &str =
    "❌ سرویس API برای دریافت زمان‌بندی در دسترس نیست. لطفا با پشتیبانی تماس بگیرید.";
pub const TIMELINE_LOADING: &str = "📊 در حال بارگذاری زمان‌بندی واریز سودها...";

/// Which drill-down follows a national-id lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupIntent {
    /// "Track payout": pick a plan, then a phase.
    TrackPayout,
    /// "My invested plans": one-item payout timeline menu.
    InvestedPlans,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Information,
    CollectNationalId(LookupIntent),
    SocialLinks,
    FreeformQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuNode {
    pub label: &'static str,
    pub kind: MenuKind,
    pub response_text: Option<&'static str>,
}

pub const ROOT_MENU: [MenuNode; 5] = [
    MenuNode {
        label: "۱. پیگیری پرداخت سود طرح",
        kind: MenuKind::CollectNationalId(LookupIntent::TrackPayout),
        response_text: None,
    },
    MenuNode {
        label: "۲. اطلاعات طرح های سرمایه گذاری شده من",
        kind: MenuKind::CollectNationalId(LookupIntent::InvestedPlans),
        response_text: None,
    },
    MenuNode {
        label: "۳. مشاوره و راهنمایی",
        kind: MenuKind::FreeformQuestion,
        response_text: Some("کارشناسان ما آماده ارائه مشاوره و راهنمایی هستند. لطفا سوال خود را مطرح کنید تا در اسرع وقت پاسخ داده شود."),
    },
    MenuNode {
        label: "۴. اطلاع رسانی از طرح های جدید زیما",
        kind: MenuKind::SocialLinks,
        response_text: Some("کاربر عزیز برای اطلاع رسانی از طرح های جدید زیما میتوانید ما را در شبکه های اجتماعی زیر دنبال کنید.\nاطلاع رسانی طرح های جدید تنها در کانال های زیر انجام خواهد شد"),
    },
    MenuNode {
        label: "۵. سایر",
        kind: MenuKind::Information,
        response_text: Some("برای سایر سوالات و درخواست‌ها، لطفا با شماره پشتیبانی تماس بگیرید یا پیام خود را ارسال کنید."),
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocialLink {
    pub label: &'static str,
    pub url: &'static str,
}

pub const SOCIAL_LINKS: [SocialLink; 3] = [
    SocialLink {
        label: "کانال بله",
        url: "http://ble.ir/Zeemacrowd",
    },
    SocialLink {
        label: "کانال تلگرام",
        url: "http://t.me/zeemacrowd",
    },
    SocialLink {
        label: "پیج اینستاگرام",
        url: "http://instagram.com/zeema.fund",
    },
];

/// A plan offered in the plan-selection drill-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanChoice {
    pub plan_id: String,
    pub symbol: String,
}

/// The single inline menu attached to the latest bot turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuView {
    Root,
    Social,
    Plans(Vec<PlanChoice>),
    Phases(Vec<String>),
    Timeline,
    ReturnOnly,
}

/// What a click on one row of a `MenuView` means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    Root(usize),
    Social(usize),
    Plan(usize),
    Phase(usize),
    ViewTimeline,
    ReturnToMenu,
}

impl MenuView {
    /// Rows in display order; every menu ends with the return item.
    pub fn entries(&self) -> Vec<(String, MenuChoice)> {
        let mut entries: Vec<(String, MenuChoice)> = match self {
            MenuView::Root => ROOT_MENU
                .iter()
                .enumerate()
                .map(|(i, node)| (node.label.to_string(), MenuChoice::Root(i)))
                .collect(),
            MenuView::Social => SOCIAL_LINKS
                .iter()
                .enumerate()
                .map(|(i, link)| (link.label.to_string(), MenuChoice::Social(i)))
                .collect(),
            MenuView::Plans(plans) => plans
                .iter()
                .enumerate()
                .map(|(i, plan)| (format!("{}. {}", i + 1, plan.symbol), MenuChoice::Plan(i)))
                .collect(),
            MenuView::Phases(titles) => titles
                .iter()
                .enumerate()
                .map(|(i, title)| (format!("{}. {}", i + 1, title), MenuChoice::Phase(i)))
                .collect(),
            MenuView::Timeline => vec![(VIEW_TIMELINE.to_string(), MenuChoice::ViewTimeline)],
            MenuView::ReturnOnly => Vec::new(),
        };
        entries.push((RETURN_TO_MENU.to_string(), MenuChoice::ReturnToMenu));
        entries
    }
}
