//! What each role gets to see in the back office.
//!
//! A static table, nothing is evaluated at runtime beyond the lookup.

use serde::Serialize;

use crate::entities::user::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavItem {
    Dashboard,
    Tickets,
    Masters,
    CreateRide,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterTab {
    City,
    Location,
    LocationCost,
    Vendor,
    User,
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardWidget {
    CountCards,
    SpendingChart,
    CityCostCarousel,
    UsersList,
    TopRidesByCities,
}

impl NavItem {
    pub fn path(self) -> &'static str {
        match self {
            NavItem::Dashboard => "/dashboard",
            NavItem::Tickets => "/tickets",
            NavItem::Masters => "/masters",
            NavItem::CreateRide => "/ride",
            NavItem::Help => "/help",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visibility {
    pub landing_path: &'static str,
    pub nav_items: &'static [NavItem],
    pub master_tabs: &'static [MasterTab],
    pub dashboard_widgets: &'static [DashboardWidget],
}

const ALL_TABS: &[MasterTab] = &[
    MasterTab::City,
    MasterTab::Location,
    MasterTab::LocationCost,
    MasterTab::Vendor,
    MasterTab::User,
    MasterTab::Transport,
];

const STAFF_WIDGETS: &[DashboardWidget] = &[
    DashboardWidget::CountCards,
    DashboardWidget::SpendingChart,
    DashboardWidget::CityCostCarousel,
    DashboardWidget::UsersList,
    DashboardWidget::TopRidesByCities,
];

const PARTNER_WIDGETS: &[DashboardWidget] = &[
    DashboardWidget::CountCards,
    DashboardWidget::SpendingChart,
    DashboardWidget::CityCostCarousel,
    DashboardWidget::TopRidesByCities,
];

pub fn visibility(role: UserRole) -> Visibility {
    match role {
        UserRole::SuperAdmin => Visibility {
            landing_path: NavItem::Tickets.path(),
            nav_items: &[NavItem::Dashboard, NavItem::Tickets, NavItem::Masters],
            master_tabs: ALL_TABS,
            dashboard_widgets: STAFF_WIDGETS,
        },
        UserRole::Admin => Visibility {
            landing_path: NavItem::Dashboard.path(),
            nav_items: &[NavItem::Dashboard, NavItem::Tickets],
            master_tabs: &[],
            dashboard_widgets: STAFF_WIDGETS,
        },
        UserRole::Transport => Visibility {
            landing_path: NavItem::Tickets.path(),
            nav_items: &[NavItem::Dashboard, NavItem::Tickets],
            master_tabs: &[],
            dashboard_widgets: PARTNER_WIDGETS,
        },
        UserRole::Vendor => Visibility {
            landing_path: NavItem::Dashboard.path(),
            nav_items: &[NavItem::Dashboard],
            master_tabs: &[],
            dashboard_widgets: PARTNER_WIDGETS,
        },
        UserRole::User => Visibility {
            landing_path: NavItem::CreateRide.path(),
            nav_items: &[NavItem::CreateRide, NavItem::Help],
            master_tabs: &[],
            dashboard_widgets: &[],
        },
    }
}

pub fn can_see_tab(role: UserRole, tab: MasterTab) -> bool {
    visibility(role).master_tabs.contains(&tab)
}

/// Roles that work the ticket queue: send codes, start and end rides, see every ticket.
pub fn can_operate_rides(role: UserRole) -> bool {
    visibility(role).nav_items.contains(&NavItem::Tickets)
}

pub fn can_view_dashboard(role: UserRole) -> bool {
    visibility(role).nav_items.contains(&NavItem::Dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_superadmin_sees_masters() {
        assert!(visibility(UserRole::SuperAdmin).nav_items.contains(&NavItem::Masters));
        for role in [UserRole::Admin, UserRole::Vendor, UserRole::Transport, UserRole::User] {
            assert!(!visibility(role).nav_items.contains(&NavItem::Masters));
            assert!(!can_see_tab(role, MasterTab::LocationCost));
        }
        assert!(can_see_tab(UserRole::SuperAdmin, MasterTab::LocationCost));
    }

    #[test]
    fn test_tickets_hidden_from_vendors_and_riders() {
        assert!(!visibility(UserRole::Vendor).nav_items.contains(&NavItem::Tickets));
        assert!(!visibility(UserRole::User).nav_items.contains(&NavItem::Tickets));
        assert!(visibility(UserRole::Transport).nav_items.contains(&NavItem::Tickets));
    }

    #[test]
    fn test_ride_operations_and_dashboard() {
        for role in [UserRole::SuperAdmin, UserRole::Admin, UserRole::Transport] {
            assert!(can_operate_rides(role));
            assert!(can_view_dashboard(role));
        }
        assert!(!can_operate_rides(UserRole::Vendor));
        assert!(can_view_dashboard(UserRole::Vendor));
        assert!(!can_operate_rides(UserRole::User));
        assert!(!can_view_dashboard(UserRole::User));
    }

    #[test]
    fn test_users_list_widget_for_staff_only() {
        for role in [UserRole::SuperAdmin, UserRole::Admin] {
            assert!(visibility(role).dashboard_widgets.contains(&DashboardWidget::UsersList));
        }
        for role in [UserRole::Vendor, UserRole::Transport] {
            assert!(!visibility(role).dashboard_widgets.contains(&DashboardWidget::UsersList));
        }
    }

    #[test]
    fn test_riders_land_on_ride_screen() {
        let rider = visibility(UserRole::User);
        assert_eq!(rider.landing_path, "/ride");
        assert!(rider.dashboard_widgets.is_empty());
        assert_eq!(visibility(UserRole::Admin).landing_path, "/dashboard");
        assert_eq!(visibility(UserRole::Vendor).landing_path, "/dashboard");
        assert_eq!(visibility(UserRole::Transport).landing_path, "/tickets");
    }

    #[test]
    fn test_landing_path_is_always_visible() {
        for role in [
            UserRole::SuperAdmin,
            UserRole::Admin,
            UserRole::Vendor,
            UserRole::Transport,
            UserRole::User,
        ] {
            let v = visibility(role);
            assert!(
                v.nav_items.iter().any(|item| item.path() == v.landing_path),
                "{:?} lands on {} which it cannot see",
                role,
                v.landing_path
            );
        }
    }
}
