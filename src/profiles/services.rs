use std::{collections::HashMap, sync::Arc};

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    profiles::{
        dto::{split_skills, supplied, EducationInput, ExperienceInput, ProfileInput},
        model::{Owner, Profile, Social},
    },
    state::AppState,
    store::{ProfileStore, UserStore},
};

const NO_PROFILE_FOR_USER: &str = "There is no profile for this user";
const NO_PROFILE: &str = "There is no profile";
const USER_NOT_FOUND: &str = "User not found";

/// Validated profile fields. `None` means "leave the stored value alone".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub status: String,
    pub githubusername: Option<String>,
    pub skills: Vec<String>,
    pub social: Social,
}

impl From<ProfileInput> for ProfileUpdate {
    fn from(input: ProfileInput) -> Self {
        Self {
            company: supplied(input.company),
            website: supplied(input.website),
            location: supplied(input.location),
            bio: supplied(input.bio),
            status: input.status.unwrap_or_default(),
            githubusername: supplied(input.githubusername),
            skills: input.skills.as_deref().map(split_skills).unwrap_or_default(),
            social: Social {
                youtube: supplied(input.youtube),
                facebook: supplied(input.facebook),
                twitter: supplied(input.twitter),
                instagram: supplied(input.instagram),
                linkedin: supplied(input.linkedin),
            },
        }
    }
}

impl ProfileUpdate {
    /// New values win; fields this update does not carry keep their stored value.
    pub fn apply(self, profile: &mut Profile) {
        overwrite(&mut profile.company, self.company);
        overwrite(&mut profile.website, self.website);
        overwrite(&mut profile.location, self.location);
        overwrite(&mut profile.bio, self.bio);
        overwrite(&mut profile.githubusername, self.githubusername);
        profile.status = self.status;
        profile.skills = self.skills;

        let social = &mut profile.social;
        overwrite(&mut social.youtube, self.social.youtube);
        overwrite(&mut social.facebook, self.social.facebook);
        overwrite(&mut social.twitter, self.social.twitter);
        overwrite(&mut social.instagram, self.social.instagram);
        overwrite(&mut social.linkedin, self.social.linkedin);
    }

    fn into_new_profile(self, user_id: Uuid) -> Profile {
        let mut profile = Profile {
            id: Uuid::new_v4(),
            user: user_id,
            company: None,
            website: None,
            location: None,
            bio: None,
            status: String::new(),
            githubusername: None,
            skills: Vec::new(),
            social: Social::default(),
            experience: Vec::new(),
            education: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.apply(&mut profile);
        profile
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if let Some(v) = value {
        *slot = Some(v);
    }
}

/// Reads and owner-only writes of profiles.
#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl FromRef<AppState> for ProfileService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.profiles.clone())
    }
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { users, profiles }
    }

    /// Creates the caller's profile or merges into the existing one.
    pub async fn upsert(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile, AppError> {
        let saved = self
            .profiles
            .update_by_user(
                user_id,
                Box::new(move |current: Option<Profile>| {
                    Some(match current {
                        Some(mut existing) => {
                            update.apply(&mut existing);
                            existing
                        }
                        None => update.into_new_profile(user_id),
                    })
                }),
            )
            .await?
            .ok_or(AppError::Unauthorized(USER_NOT_FOUND))?;
        info!(user_id = %user_id, profile_id = %saved.id, "profile saved");
        Ok(saved)
    }

    pub async fn add_experience(
        &self,
        user_id: Uuid,
        input: ExperienceInput,
    ) -> Result<Profile, AppError> {
        let entry = input.into_entry()?;
        let entry_id = entry.id;
        let profile = self
            .edit_own(user_id, move |p| p.experience.insert(0, entry))
            .await?;
        info!(user_id = %user_id, entry_id = %entry_id, "experience added");
        Ok(profile)
    }

    /// Unknown or malformed ids leave the list untouched.
    pub async fn remove_experience(&self, user_id: Uuid, entry_id: &str) -> Result<Profile, AppError> {
        let target = Uuid::parse_str(entry_id).ok();
        let entry_id = entry_id.to_owned();
        self.edit_own(user_id, move |p| {
            let before = p.experience.len();
            p.experience.retain(|e| Some(e.id) != target);
            if p.experience.len() == before {
                warn!(user_id = %user_id, entry_id = %entry_id, "no experience entry to remove");
            }
        })
        .await
    }

    pub async fn add_education(
        &self,
        user_id: Uuid,
        input: EducationInput,
    ) -> Result<Profile, AppError> {
        let entry = input.into_entry()?;
        let entry_id = entry.id;
        let profile = self
            .edit_own(user_id, move |p| p.education.insert(0, entry))
            .await?;
        info!(user_id = %user_id, entry_id = %entry_id, "education added");
        Ok(profile)
    }

    pub async fn remove_education(&self, user_id: Uuid, entry_id: &str) -> Result<Profile, AppError> {
        let target = Uuid::parse_str(entry_id).ok();
        let entry_id = entry_id.to_owned();
        self.edit_own(user_id, move |p| {
            let before = p.education.len();
            p.education.retain(|e| Some(e.id) != target);
            if p.education.len() == before {
                warn!(user_id = %user_id, entry_id = %entry_id, "no education entry to remove");
            }
        })
        .await
    }

    /// The caller's own profile, expanded with owner details.
    pub async fn get_own(&self, user_id: Uuid) -> Result<Profile<Owner>, AppError> {
        let profile = self.owned(user_id).await?;
        self.populate(profile)
            .await?
            .ok_or(AppError::NotFound(NO_PROFILE_FOR_USER))
    }

    /// Public lookup; an unparseable id is simply "no profile".
    pub async fn get_by_user(&self, user_id: &str) -> Result<Profile<Owner>, AppError> {
        let user_id = Uuid::parse_str(user_id).map_err(|_| AppError::NotFound(NO_PROFILE))?;
        let profile = self
            .profiles
            .find_by_user(user_id)
            .await?
            .ok_or(AppError::NotFound(NO_PROFILE))?;
        self.populate(profile)
            .await?
            .ok_or(AppError::NotFound(NO_PROFILE))
    }

    /// Every profile whose owner still exists, oldest first.
    pub async fn list(&self) -> Result<Vec<Profile<Owner>>, AppError> {
        let profiles = self.profiles.list().await?;
        let ids: Vec<Uuid> = profiles.iter().map(|p| p.user).collect();
        let owners: HashMap<Uuid, Owner> = self
            .users
            .find_many(&ids)
            .await?
            .iter()
            .map(|u| (u.id, Owner::from(u)))
            .collect();

        Ok(profiles
            .into_iter()
            .filter_map(|p| match owners.get(&p.user) {
                Some(owner) => Some(p.with_owner(owner.clone())),
                None => {
                    warn!(profile_id = %p.id, user_id = %p.user, "skipping orphaned profile");
                    None
                }
            })
            .collect())
    }

    /// Removes the profile, then the account. Not atomic across the pair: a
    /// failure between the two leaves the account without a profile.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), AppError> {
        self.profiles.delete_by_user(user_id).await?;
        self.users.delete(user_id).await?;
        info!(user_id = %user_id, "account deleted");
        Ok(())
    }

    /// Applies `edit` to the caller's existing profile as one store update.
    async fn edit_own<F>(&self, user_id: Uuid, edit: F) -> Result<Profile, AppError>
    where
        F: FnOnce(&mut Profile) + Send + 'static,
    {
        self.profiles
            .update_by_user(
                user_id,
                Box::new(move |current: Option<Profile>| {
                    current.map(|mut profile| {
                        edit(&mut profile);
                        profile
                    })
                }),
            )
            .await?
            .ok_or(AppError::NotFound(NO_PROFILE_FOR_USER))
    }

    async fn owned(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.profiles
            .find_by_user(user_id)
            .await?
            .ok_or(AppError::NotFound(NO_PROFILE_FOR_USER))
    }

    async fn populate(&self, profile: Profile) -> Result<Option<Profile<Owner>>, AppError> {
        let owner = self.users.find_by_id(profile.user).await?;
        Ok(owner.map(|u| profile.with_owner(Owner::from(&u))))
    }
}
