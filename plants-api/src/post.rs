use std::fmt;

/// Filename the text body is uploaded under
pub const TEXT_PART_FILENAME: &str = "text_0.txt";

pub const DEFAULT_FEED_PAGE_SIZE: u32 = 12;
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 8;

pub const MAX_TITLE_CHARS: usize = 60;
pub const MAX_IMAGES: usize = 10;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> PostId {
        PostId(String::from(s))
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryCategory {
    All,
    Daily,
    Qna,
    Tip,
}

impl PrimaryCategory {
    pub const ALL: [PrimaryCategory; 4] = [
        PrimaryCategory::All,
        PrimaryCategory::Daily,
        PrimaryCategory::Qna,
        PrimaryCategory::Tip,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            PrimaryCategory::All => "all",
            PrimaryCategory::Daily => "daily",
            PrimaryCategory::Qna => "qna",
            PrimaryCategory::Tip => "tip",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PrimaryCategory::All => "전체",
            PrimaryCategory::Daily => "일상",
            PrimaryCategory::Qna => "Q&A",
            PrimaryCategory::Tip => "팁",
        }
    }

    pub fn from_slug(slug: &str) -> Option<PrimaryCategory> {
        PrimaryCategory::ALL.into_iter().find(|c| c.slug() == slug)
    }

    pub fn from_label(label: &str) -> Option<PrimaryCategory> {
        PrimaryCategory::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Secondary categories selectable under this one, `all` first
    pub fn secondaries(self) -> &'static [SecondaryCategory] {
        use SecondaryCategory::*;
        match self {
            PrimaryCategory::All | PrimaryCategory::Tip => &[All],
            PrimaryCategory::Daily => &[
                All,
                FoliageWildflower,
                Geranium,
                Begonia,
                SucculentCactus,
                CarnivorousVineBulb,
                FernMossAquatic,
                VerandaGarden,
                FarmVegetable,
                PlantShopping,
                Etc,
            ],
            PrimaryCategory::Qna => &[
                All,
                WateringSoil,
                LeafGrowthPest,
                WaterLeafCutting,
                CuttingDivision,
                RepottingPruning,
                OverwinteringSeed,
                PlantRecommend,
                Etc,
            ],
        }
    }
}

impl fmt::Display for PrimaryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecondaryCategory {
    All,
    FoliageWildflower,
    Geranium,
    Begonia,
    SucculentCactus,
    CarnivorousVineBulb,
    FernMossAquatic,
    VerandaGarden,
    FarmVegetable,
    PlantShopping,
    WateringSoil,
    LeafGrowthPest,
    WaterLeafCutting,
    CuttingDivision,
    RepottingPruning,
    OverwinteringSeed,
    PlantRecommend,
    Etc,
}

impl SecondaryCategory {
    pub const ALL: [SecondaryCategory; 18] = {
        use SecondaryCategory::*;
        [
            All,
            FoliageWildflower,
            Geranium,
            Begonia,
            SucculentCactus,
            CarnivorousVineBulb,
            FernMossAquatic,
            VerandaGarden,
            FarmVegetable,
            PlantShopping,
            WateringSoil,
            LeafGrowthPest,
            WaterLeafCutting,
            CuttingDivision,
            RepottingPruning,
            OverwinteringSeed,
            PlantRecommend,
            Etc,
        ]
    };

    pub fn from_slug(slug: &str) -> Option<SecondaryCategory> {
        SecondaryCategory::ALL.into_iter().find(|c| c.slug() == slug)
    }

    pub fn slug(self) -> &'static str {
        use SecondaryCategory::*;
        match self {
            All => "all",
            FoliageWildflower => "foliage-wildflower",
            Geranium => "geranium",
            Begonia => "begonia",
            SucculentCactus => "succulent-cactus",
            CarnivorousVineBulb => "carnivorous-vine-bulb",
            FernMossAquatic => "fern-moss-aquatic",
            VerandaGarden => "veranda-garden",
            FarmVegetable => "farm-vegetable",
            PlantShopping => "plant-shopping",
            WateringSoil => "watering-soil",
            LeafGrowthPest => "leaf-growth-pest",
            WaterLeafCutting => "water-leaf-cutting",
            CuttingDivision => "cutting-division",
            RepottingPruning => "repotting-pruning",
            OverwinteringSeed => "overwintering-seed",
            PlantRecommend => "plant-recommend",
            Etc => "etc",
        }
    }

    pub fn label(self) -> &'static str {
        use SecondaryCategory::*;
        match self {
            All => "전체",
            FoliageWildflower => "관엽/야생화",
            Geranium => "제라늄",
            Begonia => "베고니아",
            SucculentCactus => "다육/선인장",
            CarnivorousVineBulb => "식충/덩굴/구근",
            FernMossAquatic => "양치/이끼/수생",
            VerandaGarden => "베란다 정원",
            FarmVegetable => "텃밭/채소",
            PlantShopping => "식물 쇼핑",
            WateringSoil => "물주기/흙",
            LeafGrowthPest => "잎/생장/병충해",
            WaterLeafCutting => "물꽂이/잎꽂이",
            CuttingDivision => "삽목/포기나누기",
            RepottingPruning => "분갈이/가지치기",
            OverwinteringSeed => "월동/파종",
            PlantRecommend => "식물 추천",
            Etc => "기타",
        }
    }

    pub fn belongs_to(self, primary: PrimaryCategory) -> bool {
        primary.secondaries().contains(&self)
    }
}

impl fmt::Display for SecondaryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Audio,
    File,
}

/// One ordered block of a post body. `data` is the text itself for text
/// parts and a URL (or data URL) for media.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub order: u32,
    #[serde(default)]
    pub filename: String,
    pub data: String,
}

fn joined_text(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter(|c| c.kind == ContentKind::Text)
        .map(|c| c.data.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A feed card
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub post_id: PostId,
    /// Display label, eg. `일상`
    pub primary_category: String,
    pub secondary_category: String,
    pub nickname: String,
    pub title: String,
    /// First text and image parts only
    pub content: Vec<ContentPart>,
    pub like_count: i64,
    pub published_at: String,
    pub comment_count: i64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<PostSummary>,
    pub next_post_id: Option<PostId>,
    pub has_next: bool,
    pub size: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub author_uuid: String,
    pub author_nickname: String,
    pub title: String,
    pub content: Vec<ContentPart>,
    pub primary_category: String,
    pub secondary_category: String,
    pub view_count: i64,
    pub like_count: i64,
    pub bookmark_count: i64,
    pub comment_count: i64,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
}

impl PostDetail {
    pub fn text(&self) -> String {
        joined_text(&self.content)
    }

    pub fn images(&self) -> impl Iterator<Item = &ContentPart> {
        self.content.iter().filter(|c| c.kind == ContentKind::Image)
    }
}

/// Prefill for the edit screen
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEditData {
    pub primary_category_id: String,
    pub secondary_category_id: String,
    pub title: String,
    pub content: Vec<ContentPart>,
}

impl PostEditData {
    pub fn text(&self) -> String {
        joined_text(&self.content)
    }
}

/// Page-numbered listing used by the mypage screens
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedPosts {
    pub posts: Vec<PostSummary>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub has_next: bool,
}

/// Cursor query for the main feed
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListPosts {
    pub size: u32,
    pub last_post_id: Option<PostId>,
    pub primary_category_id: Option<String>,
    pub secondary_category_id: Option<String>,
}

impl Default for ListPosts {
    fn default() -> ListPosts {
        ListPosts {
            size: DEFAULT_FEED_PAGE_SIZE,
            last_post_id: None,
            primary_category_id: None,
            secondary_category_id: None,
        }
    }
}

impl ListPosts {
    /// `size` is always sent, the rest only when set
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut q = vec![("size", self.size.to_string())];
        if let Some(id) = &self.last_post_id {
            q.push(("lastPostId", id.0.clone()));
        }
        if let Some(id) = self.primary_category_id.as_ref().filter(|s| !s.is_empty()) {
            q.push(("primaryCategoryId", id.clone()));
        }
        if let Some(id) = self.secondary_category_id.as_ref().filter(|s| !s.is_empty()) {
            q.push(("secondaryCategoryId", id.clone()));
        }
        q
    }
}

/// 1-based page request
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> PageRequest {
        PageRequest {
            page: 1,
            size: DEFAULT_LIST_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![("page", self.page.to_string()), ("size", self.size.to_string())]
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct ImageFile {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("filename", &self.filename)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageFile {
    /// Guesses the type from the extension; unknown extensions stay
    /// `application/octet-stream` and get rejected by validation.
    pub fn new(filename: String, bytes: Vec<u8>) -> ImageFile {
        let ext = filename.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
        let mime = match ext.as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        };
        ImageFile {
            filename,
            mime: String::from(mime),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct OrderInfo {
    pub filename: String,
    pub order: u32,
}

/// Post being written or edited. Sent as multipart with the metadata in the
/// query string.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PostDraft {
    pub primary_category_id: String,
    pub secondary_category_id: String,
    pub title: String,
    pub text_content: String,
    pub images: Vec<ImageFile>,
}

impl PostDraft {
    pub fn from_edit_data(data: &PostEditData) -> PostDraft {
        PostDraft {
            primary_category_id: data.primary_category_id.clone(),
            secondary_category_id: data.secondary_category_id.clone(),
            title: data.title.clone(),
            text_content: data.text(),
            images: Vec::new(),
        }
    }

    /// Whether a text part gets uploaded at all
    pub fn has_text(&self) -> bool {
        !self.text_content.trim().is_empty()
    }

    /// Upload order: text first when present, then images as given, from 1
    pub fn order_info(&self) -> Vec<OrderInfo> {
        let text = self.has_text().then_some(TEXT_PART_FILENAME);
        text.into_iter()
            .chain(self.images.iter().map(|i| i.filename.as_str()))
            .zip(1..)
            .map(|(filename, order)| OrderInfo {
                filename: String::from(filename),
                order,
            })
            .collect()
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("primaryCategoryId", self.primary_category_id.clone()),
            ("secondaryCategoryId", self.secondary_category_id.clone()),
            ("title", self.title.clone()),
            ("isPublished", String::from("true")),
        ]
    }
}
