/// Session key holding the signed-in user's id
pub const USER_ID_KEY: &str = "userId";

/// Default base URL of the HabitBuddy user service
pub const DEFAULT_API_URL: &str =
    "https://asia-south1-habitbuddy-d67d1.cloudfunctions.net/userservice";
