//! Role claim aggregation.
//!
//! Claims arrive as colon-delimited strings, either `org:role:status` or the
//! extended `enrolment:org:gpg45:gpg46:role:status`, next to `id:name`
//! pairs naming every id. They are deduplicated on `(org, role, status)` in
//! first-seen order and then spread into the four [`RoleIndex`] views.
//! Nothing here fails: missing parts and unknown ids become empty strings.

use std::collections::HashMap;

use idm_dynamics_sdk::{
    Enrolment, FlatRole, NamedRef, OrgRoles, RoleIndex, RoleView, ServiceEnrolment,
};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleClaim {
    pub enrolment_id: Option<String>,
    pub org_id: String,
    pub gpg45: Option<String>,
    pub gpg46: Option<String>,
    pub role_id: String,
    pub status_id: String,
    /// Signup in progress; skipped unless asked for.
    pub handshake: bool,
}

impl RoleClaim {
    /// Split a claim string. Six or more parts read as the extended form,
    /// anything shorter as `org:role:status` with missing parts left empty.
    ///
    /// Token claims never mark a handshake, so `handshake` is always false.
    #[must_use]
    pub fn parse(claim: &str) -> Self {
        let parts: Vec<&str> = claim.split(':').collect();
        let part = |i: usize| parts.get(i).copied().unwrap_or_default().to_owned();

        if parts.len() >= 6 {
            Self {
                enrolment_id: Some(part(0)),
                org_id: part(1),
                gpg45: Some(part(2)),
                gpg46: Some(part(3)),
                role_id: part(4),
                status_id: part(5),
                handshake: false,
            }
        } else {
            Self {
                enrolment_id: None,
                org_id: part(0),
                gpg45: None,
                gpg46: None,
                role_id: part(1),
                status_id: part(2),
                handshake: false,
            }
        }
    }

    #[must_use]
    pub fn from_enrolment(enrolment: &Enrolment) -> Self {
        Self {
            enrolment_id: None,
            org_id: enrolment.account_id.clone().unwrap_or_default(),
            gpg45: None,
            gpg46: None,
            role_id: enrolment.service_role_id.clone().unwrap_or_default(),
            status_id: enrolment
                .enrolment_status
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            handshake: enrolment.is_handshake,
        }
    }

    fn key(&self) -> (&str, &str, &str) {
        (&self.org_id, &self.role_id, &self.status_id)
    }

    /// `org:role:status`
    #[must_use]
    pub fn short_form(&self) -> String {
        format!("{}:{}:{}", self.org_id, self.role_id, self.status_id)
    }
}

/// Display names by id, built from `id:name` pairs.
///
/// The first pair for an id wins. Whether the upstream ever sends two
/// different names for one id has not been observed either way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameLookup {
    names: HashMap<String, String>,
}

impl NameLookup {
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = pairs.into_iter().fold(HashMap::new(), |mut names, pair| {
            let (id, name) = pair.as_ref().split_once(':').unwrap_or((pair.as_ref(), ""));
            names
                .entry(id.to_owned())
                .or_insert_with(|| name.to_owned());
            names
        });
        Self { names }
    }

    /// Empty string for unknown ids.
    #[must_use]
    pub fn name(&self, id: &str) -> &str {
        self.names.get(id).map_or("", String::as_str)
    }

    fn named(&self, id: &str) -> NamedRef {
        NamedRef::new(id, self.name(id))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    pub include_handshake: bool,
}

struct ResolvedRole {
    organisation: NamedRef,
    view: RoleView,
}

impl ResolvedRole {
    fn new(claim: &RoleClaim, names: &NameLookup) -> Self {
        Self {
            organisation: names.named(&claim.org_id),
            view: RoleView {
                id: claim.role_id.clone(),
                name: names.name(&claim.role_id).to_owned(),
                gpg45: claim.gpg45.clone(),
                gpg46: claim.gpg46.clone(),
                enrolment: claim.enrolment_id.as_deref().map(|id| names.named(id)),
                status: names.named(&claim.status_id),
            },
        }
    }

    fn flat(&self) -> FlatRole {
        FlatRole {
            enrolment_id: self.view.enrolment.as_ref().map(|e| e.id.clone()),
            enrolment_name: self.view.enrolment.as_ref().map(|e| e.name.clone()),
            gpg45: self.view.gpg45.clone(),
            gpg46: self.view.gpg46.clone(),
            role_id: self.view.id.clone(),
            role_name: self.view.name.clone(),
            org_id: self.organisation.id.clone(),
            org_name: self.organisation.name.clone(),
            org_role_status_id: self.view.status.id.clone(),
            org_role_status_name: self.view.status.name.clone(),
        }
    }
}

fn org_roles(organisation: &NamedRef) -> OrgRoles {
    OrgRoles {
        organisation: organisation.clone(),
        roles: IndexMap::new(),
    }
}

/// Deduplicate `claims` and derive every view of the result.
///
/// In the by-org and by-role views an `(org, role)` slot holds the first
/// status seen for it; by-status and flat keep one entry per status.
///
/// Handshake filtering only affects claims built with
/// [`RoleClaim::from_enrolment`]; parsed claims are never handshakes.
#[must_use]
pub fn aggregate<'a, I>(claims: I, names: &NameLookup, options: AggregateOptions) -> RoleIndex
where
    I: IntoIterator<Item = &'a RoleClaim>,
{
    let unique = claims
        .into_iter()
        .filter(|claim| options.include_handshake || !claim.handshake)
        .fold(IndexMap::new(), |mut unique, claim| {
            unique
                .entry(claim.key())
                .or_insert_with(|| ResolvedRole::new(claim, names));
            unique
        });

    unique
        .into_values()
        .fold(RoleIndex::default(), |mut index, role| {
            let org_id = role.organisation.id.clone();
            let role_id = role.view.id.clone();
            let status_id = role.view.status.id.clone();

            index
                .roles_by_org
                .entry(org_id.clone())
                .or_insert_with(|| org_roles(&role.organisation))
                .roles
                .entry(role_id.clone())
                .or_insert_with(|| role.view.clone());

            index
                .roles_by_status
                .entry(status_id)
                .or_default()
                .entry(org_id.clone())
                .or_insert_with(|| org_roles(&role.organisation))
                .roles
                .entry(role_id.clone())
                .or_insert_with(|| role.view.clone());

            index
                .roles_by_role
                .entry(role_id)
                .or_default()
                .entry(org_id)
                .or_insert_with(|| role.view.clone());

            index.flat.push(role.flat());
            index
        })
}

/// Views over the `roles` and `roleMappings` claims of an identity token.
#[must_use]
pub fn aggregate_authz_claims<S: AsRef<str>>(roles: &[S], role_mappings: &[S]) -> RoleIndex {
    let claims: Vec<RoleClaim> = roles.iter().map(|r| RoleClaim::parse(r.as_ref())).collect();
    let names = NameLookup::from_pairs(role_mappings);
    aggregate(&claims, &names, AggregateOptions::default())
}

/// Role claims and name mappings for a set of service-user links, in the
/// same string form the identity provider issues.
#[must_use]
pub fn service_enrolment(enrolments: &[Enrolment], include_handshake: bool) -> ServiceEnrolment {
    let (roles, mappings) = enrolments
        .iter()
        .filter(|e| include_handshake || !e.is_handshake)
        .fold(
            (IndexSet::new(), IndexMap::new()),
            |(mut roles, mut mappings): (IndexSet<String>, IndexMap<String, String>), e| {
                let claim = RoleClaim::from_enrolment(e);
                roles.insert(claim.short_form());

                let named = [
                    (&claim.org_id, e.account_name.as_deref()),
                    (&claim.role_id, e.service_role_name.as_deref()),
                    (&claim.status_id, e.enrolment_status_name.as_deref()),
                ];
                for (id, name) in named {
                    // Personal enrolments carry no organisation.
                    if id.is_empty() {
                        continue;
                    }
                    mappings
                        .entry(id.clone())
                        .or_insert_with(|| format!("{id}:{}", name.unwrap_or_default()));
                }
                (roles, mappings)
            },
        );

    ServiceEnrolment {
        roles: roles.into_iter().collect(),
        mappings: mappings.into_values().collect(),
    }
}
